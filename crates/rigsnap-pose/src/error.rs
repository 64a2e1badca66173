//! Error types for the pose engine.

use rigsnap_spec::ParamsError;
use thiserror::Error;

/// Result type for pose engine operations.
pub type PoseResult<T> = Result<T, PoseError>;

/// How an error is surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad references or parameters; the operator cancels before mutating.
    InvalidParameters,
    /// An expected constraint or sub-structure is absent; the step is skipped.
    MissingDependency,
    /// Anything else.
    Internal,
}

/// Errors that can occur while reading or writing a rig.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoseError {
    /// A bone name does not exist on the rig.
    #[error("bone '{name}' not found")]
    BoneNotFound { name: String },

    /// A custom property does not exist on a bone.
    #[error("property '{prop}' not found on bone '{bone}'")]
    PropertyNotFound { bone: String, prop: String },

    /// The rig has no action to bake.
    #[error("rig has no action")]
    NoAction,

    /// Operator parameters failed validation.
    #[error(transparent)]
    InvalidParams(#[from] ParamsError),

    /// A bone uses a rotation mode the algorithm cannot decompose into.
    #[error("bone '{bone}' uses unsupported rotation mode {mode}")]
    UnsupportedRotationMode { bone: String, mode: String },

    /// An expected constraint is missing.
    #[error("{kind} constraint not found on bone '{bone}'")]
    ConstraintNotFound { bone: String, kind: String },

    /// Expected rig data is missing.
    #[error("missing data: {what}")]
    MissingData { what: String },

    /// Captured state does not cover the chains being written.
    #[error("captured {actual} matrices, need at least {expected}")]
    StateTooShort { expected: usize, actual: usize },

    /// A matrix that must be inverted is singular.
    #[error("matrix for bone '{bone}' is not invertible")]
    SingularMatrix { bone: String },

    /// A rig document could not be parsed.
    #[error("failed to parse rig: {0}")]
    Parse(String),
}

impl PoseError {
    /// Creates a bone not found error.
    pub fn bone_not_found(name: impl Into<String>) -> Self {
        Self::BoneNotFound { name: name.into() }
    }

    /// Creates a property not found error.
    pub fn property_not_found(bone: impl Into<String>, prop: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            bone: bone.into(),
            prop: prop.into(),
        }
    }

    /// Creates a missing data error.
    pub fn missing_data(what: impl Into<String>) -> Self {
        Self::MissingData { what: what.into() }
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            PoseError::BoneNotFound { .. } => "POSE_001",
            PoseError::PropertyNotFound { .. } => "POSE_002",
            PoseError::NoAction => "POSE_003",
            PoseError::InvalidParams(_) => "POSE_004",
            PoseError::UnsupportedRotationMode { .. } => "POSE_005",
            PoseError::ConstraintNotFound { .. } => "POSE_006",
            PoseError::MissingData { .. } => "POSE_007",
            PoseError::StateTooShort { .. } => "POSE_008",
            PoseError::SingularMatrix { .. } => "POSE_009",
            PoseError::Parse(_) => "POSE_010",
        }
    }

    /// Returns how the error is surfaced.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoseError::BoneNotFound { .. }
            | PoseError::PropertyNotFound { .. }
            | PoseError::NoAction
            | PoseError::InvalidParams(_) => ErrorKind::InvalidParameters,
            PoseError::ConstraintNotFound { .. } | PoseError::MissingData { .. } => {
                ErrorKind::MissingDependency
            }
            PoseError::UnsupportedRotationMode { .. }
            | PoseError::StateTooShort { .. }
            | PoseError::SingularMatrix { .. }
            | PoseError::Parse(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PoseError::bone_not_found("hand_ik");
        assert!(err.to_string().contains("hand_ik"));
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);

        let err = PoseError::ConstraintNotFound {
            bone: "wheel_front".into(),
            kind: "shrinkwrap".into(),
        };
        assert_eq!(err.code(), "POSE_006");
        assert_eq!(err.kind(), ErrorKind::MissingDependency);
    }

    #[test]
    fn test_params_error_converts() {
        let err: PoseError = ParamsError::NoParents.into();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);
        assert!(err.to_string().contains("parent_names"));
    }
}
