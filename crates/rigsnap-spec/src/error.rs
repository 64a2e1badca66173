//! Parameter validation errors.

use thiserror::Error;

/// Errors raised when operator parameters are malformed.
///
/// These are detected before an operator touches the rig, so the operator
/// can be cancelled without side effects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    /// A required bone chain is empty.
    #[error("{field} must name at least one bone")]
    EmptyChain { field: &'static str },

    /// A chain is shorter than the operator requires.
    #[error("{field} must name at least {min} bones, got {actual}")]
    ChainTooShort {
        field: &'static str,
        min: usize,
        actual: usize,
    },

    /// Two chains that are matched index-by-index have different lengths.
    #[error("{left} has {left_len} bones but {right} has {right_len}")]
    ChainLengthMismatch {
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    },

    /// A required name field is blank.
    #[error("{field} must not be empty")]
    MissingName { field: &'static str },

    /// The switch-parent candidate list is empty.
    #[error("parent_names must list at least one parent")]
    NoParents,

    /// The selected parent index is outside the candidate list.
    #[error("selected parent {selected} is out of range for {count} parents")]
    SelectionOutOfRange { selected: usize, count: usize },

    /// The explicit frame range is reversed.
    #[error("frame range start {start} is after end {end}")]
    InvalidFrameRange { start: i32, end: i32 },

    /// The operator has no bake variant.
    #[error("operator '{operator}' cannot be baked")]
    NotBakeable { operator: &'static str },

    /// An invocation document could not be parsed.
    #[error("failed to parse invocation: {0}")]
    Parse(String),
}

impl ParamsError {
    /// Returns the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ParamsError::EmptyChain { .. } => "PARAMS_001",
            ParamsError::ChainTooShort { .. } => "PARAMS_002",
            ParamsError::ChainLengthMismatch { .. } => "PARAMS_003",
            ParamsError::MissingName { .. } => "PARAMS_004",
            ParamsError::NoParents => "PARAMS_005",
            ParamsError::SelectionOutOfRange { .. } => "PARAMS_006",
            ParamsError::InvalidFrameRange { .. } => "PARAMS_007",
            ParamsError::Parse(_) => "PARAMS_008",
            ParamsError::NotBakeable { .. } => "PARAMS_009",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParamsError::ChainTooShort {
            field: "ik_bones",
            min: 3,
            actual: 2,
        };
        assert!(err.to_string().contains("at least 3 bones"));
        assert_eq!(err.code(), "PARAMS_002");

        let err = ParamsError::SelectionOutOfRange {
            selected: 4,
            count: 2,
        };
        assert!(err.to_string().contains("out of range"));
    }
}
