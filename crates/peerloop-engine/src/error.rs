//! Engine error types.

use peerloop_core::error::PeerloopError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("assignment has no questions")]
    EmptyQuestions,

    #[error("question {index} is blank")]
    BlankQuestion { index: usize },

    #[error("due date precedes start date")]
    DatesInverted,

    #[error("assignment has not opened yet")]
    NotYetOpen,

    #[error("submission window is not open")]
    WindowNotOpen,

    #[error("caller is not the assigned reviewer")]
    NotAssignedReviewer,

    #[error("expected {expected} ratings, got {actual}")]
    RatingCountMismatch { expected: usize, actual: usize },

    #[error("rating {value} is outside the accepted range {min}..={max}")]
    RatingOutOfRange { value: i64, min: i64, max: i64 },

    #[error("questions cannot change once completed reviews exist")]
    QuestionsLocked,

    #[error("review graph generation failed: {0}")]
    GenerationFailed(String),
}

impl From<EngineError> for PeerloopError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::EmptyQuestions
            | EngineError::BlankQuestion { .. }
            | EngineError::DatesInverted
            | EngineError::NotYetOpen
            | EngineError::RatingCountMismatch { .. }
            | EngineError::RatingOutOfRange { .. }
            | EngineError::QuestionsLocked => PeerloopError::Validation {
                message: err.to_string(),
            },
            EngineError::WindowNotOpen => PeerloopError::WindowClosed {
                reason: err.to_string(),
            },
            EngineError::NotAssignedReviewer => PeerloopError::Authorization {
                reason: err.to_string(),
            },
            EngineError::GenerationFailed(msg) => PeerloopError::Internal(msg),
        }
    }
}
