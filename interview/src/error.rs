use crate::session::SessionId;
use crate::session::WorkflowKind;
use std::fmt;
use thiserror::Error;

/// A single violated domain rule, reported inline against the field it
/// concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterviewError {
    #[error("operation not allowed in the current session state: {0}")]
    InvalidSessionState(String),

    #[error("a {kind} session is already in progress ({session_id})")]
    AlreadyInProgress {
        kind: WorkflowKind,
        session_id: SessionId,
    },

    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("session {session_id} belongs to the {actual} workflow, not {expected}")]
    WorkflowMismatch {
        session_id: SessionId,
        expected: WorkflowKind,
        actual: WorkflowKind,
    },

    #[error("validation failed: {}", join_violations(.0))]
    ValidationFailed(Vec<FieldViolation>),

    #[error("vagueness check unavailable: {0}")]
    VaguenessGateUnavailable(String),

    #[error("vagueness check failed: {0}")]
    GateCallFailed(String),

    #[error("failed to persist session snapshot: {0}")]
    PersistenceWriteFailed(String),

    #[error("failed to read session snapshot: {0}")]
    PersistenceReadFailed(String),

    #[error("finalize failed: {0}")]
    ExternalGenerationFailed(String),
}

impl InterviewError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed(vec![FieldViolation::new(field, message)])
    }

    /// True when retrying the same call can succeed without user changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::GateCallFailed(_)
                | Self::PersistenceWriteFailed(_)
                | Self::PersistenceReadFailed(_)
                | Self::ExternalGenerationFailed(_)
        )
    }

    /// Text suitable for showing to the person answering.
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationFailed(violations) => join_violations(violations),
            Self::VaguenessGateUnavailable(_) => {
                "Answer checking is offline; answers are accepted as given.".to_string()
            }
            Self::GateCallFailed(_)
            | Self::PersistenceWriteFailed(_)
            | Self::ExternalGenerationFailed(_) => {
                "Something went wrong saving your progress. Try again.".to_string()
            }
            Self::InvalidSessionState(_)
            | Self::AlreadyInProgress { .. }
            | Self::NotFound(_)
            | Self::WorkflowMismatch { .. }
            | Self::PersistenceReadFailed(_) => {
                "This session cannot continue. Resume it or start a new one.".to_string()
            }
        }
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let err = InterviewError::ValidationFailed(vec![
            FieldViolation::new("name", "required"),
            FieldViolation::new("what_breaks", "required"),
        ]);
        assert_eq!(err.user_message(), "name: required; what_breaks: required");
        assert!(!err.is_retryable());
    }

    #[test]
    fn lifecycle_errors_get_generic_guidance() {
        let err = InterviewError::InvalidSessionState("finalized".into());
        assert!(err.user_message().contains("Resume it or start a new one"));
    }
}
