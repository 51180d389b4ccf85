//! Error types for the Cleanflow workflow
//!
//! Every error here is recoverable: parse and validation errors send the
//! operator back to scanning, state errors are programming/UI mistakes
//! that are logged and ignored, and submission errors keep the reviewed
//! run so the operator can resubmit.

use crate::{AreaId, ProcedureId, StepId};

/// A scanned string that matches none of the accepted wire formats
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Empty scan payload")]
    Empty,

    #[error("Malformed token format: {0}")]
    MalformedTokenFormat(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("Invalid percent-encoding in field '{field}'")]
    InvalidEncoding { field: String },
}

/// A syntactically valid scan that the catalog cannot resolve
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown area: {0}")]
    UnknownArea(AreaId),
}

/// An event that is not legal in the current workflow state
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Invalid transition: {event} not allowed in state {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    #[error("Step not part of the current procedure: {0}")]
    UnknownStep(StepId),

    #[error("Procedure not in the active set: {0}")]
    UnknownProcedure(ProcedureId),
}

/// A failed attempt to persist a run record
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Submission timed out after {0} ms")]
    Timeout(u64),
}

impl SubmissionError {
    /// Message suitable for showing to the operator
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Storage(_) => {
                "The run could not be saved. Check your connection and submit again.".to_string()
            }
            SubmissionError::Timeout(_) => {
                "Saving the run took too long. Submit again to retry.".to_string()
            }
        }
    }
}

/// Why a scan did not move the workflow forward
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ScanError {
    pub fn user_message(&self) -> String {
        match self {
            ScanError::Parse(_) => "This code is not a recognized Cleanflow code. Scan again.".into(),
            ScanError::Validation(ValidationError::UnknownArea(_)) => {
                "This area is not registered. Scan again or enter it manually.".into()
            }
        }
    }
}

/// Umbrella error for engine operations
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

impl From<ParseError> for EngineError {
    fn from(e: ParseError) -> Self {
        EngineError::Scan(e.into())
    }
}

impl From<ValidationError> for EngineError {
    fn from(e: ValidationError) -> Self {
        EngineError::Scan(e.into())
    }
}

impl EngineError {
    /// Nothing in the core is fatal
    pub fn is_recoverable(&self) -> bool {
        true
    }

    /// Operator-facing message. State errors are not meant for operators.
    pub fn user_message(&self) -> Option<String> {
        match self {
            EngineError::Scan(e) => Some(e.user_message()),
            EngineError::Submission(e) => Some(e.user_message()),
            EngineError::State(_) => None,
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let msg = StateError::InvalidTransition {
            state: "review",
            event: "submit_confirmed",
        }
        .to_string();
        assert_eq!(
            msg,
            "Invalid transition: submit_confirmed not allowed in state review"
        );
    }

    #[test]
    fn test_state_errors_have_no_user_message() {
        let err = EngineError::from(StateError::InvalidTransition {
            state: "scanning",
            event: "step_completed",
        });
        assert!(err.user_message().is_none());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_parse_error_converts_through_scan_error() {
        let err = EngineError::from(ParseError::Empty);
        assert!(matches!(err, EngineError::Scan(ScanError::Parse(_))));
        assert!(err.user_message().is_some());
    }
}
