//! Operator reports.
//!
//! Every invocation ends in an [`OperatorReport`]: a final status plus the
//! messages raised along the way. Failures never escape as panics or errors;
//! they are folded into the report.

use serde::{Deserialize, Serialize};

/// Final status of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorStatus {
    /// The operator ran. It may still have reported errors.
    #[default]
    Finished,
    /// The operator aborted before changing anything.
    Cancelled,
}

/// Severity of a report message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportLevel {
    /// Informational.
    Info,
    /// Something was skipped.
    Warning,
    /// Something failed.
    Error,
}

/// A single report message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportMessage {
    /// Severity.
    pub level: ReportLevel,
    /// Human-readable message.
    pub message: String,
    /// Error code, when the message comes from a typed error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ReportMessage {
    /// Creates a message without a code.
    pub fn new(level: ReportLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            code: None,
        }
    }

    /// Creates a message with an error code.
    pub fn with_code(level: ReportLevel, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

/// Outcome of one operator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorReport {
    /// Operator identifier.
    pub operator: String,
    /// Display label of the invocation.
    pub description: String,
    /// Final status.
    pub status: OperatorStatus,
    /// Frames that were revisited, in scene time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<i32>,
    /// Messages in the order they were raised.
    #[serde(default)]
    pub messages: Vec<ReportMessage>,
}

impl OperatorReport {
    /// Creates a finished report with no messages.
    pub fn new(operator: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            description: description.into(),
            status: OperatorStatus::Finished,
            frames: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Appends a message.
    pub fn push(&mut self, message: ReportMessage) {
        self.messages.push(message);
    }

    /// Appends an informational message.
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ReportMessage::new(ReportLevel::Info, message));
    }

    /// Appends a warning.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(ReportMessage::new(ReportLevel::Warning, message));
    }

    /// Appends an error.
    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ReportMessage::new(ReportLevel::Error, message));
    }

    /// Appends an error with a code.
    pub fn error_with_code(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.push(ReportMessage::with_code(ReportLevel::Error, code, message));
    }

    /// Marks the report cancelled.
    pub fn cancel(&mut self) {
        self.status = OperatorStatus::Cancelled;
    }

    /// Returns true if the operator was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status == OperatorStatus::Cancelled
    }

    /// Returns true if any error was reported.
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.level == ReportLevel::Error)
    }

    /// Returns the messages at the given level.
    pub fn messages_at(&self, level: ReportLevel) -> impl Iterator<Item = &ReportMessage> {
        self.messages.iter().filter(move |m| m.level == level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_levels() {
        let mut report = OperatorReport::new("switch_parent", "Switch parent");
        report.warning("No keys to bake.");
        assert!(!report.has_errors());
        report.error_with_code("POSE_001", "Invalid parameters");
        assert!(report.has_errors());
        assert_eq!(report.messages_at(ReportLevel::Warning).count(), 1);
    }

    #[test]
    fn test_report_serialization_skips_empty_frames() {
        let mut report = OperatorReport::new("generic_snap", "Snap FK to IK on the current frame");
        report.cancel();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "cancelled");
        assert!(json.get("frames").is_none());
    }
}
