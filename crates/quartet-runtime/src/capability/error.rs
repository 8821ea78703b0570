//! Capability execution errors.

use crate::task::TaskRunnerError;
use quartet_types::{ErrorCode, ParseModeError};
use thiserror::Error;

/// A capability handler failed.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The payload has the wrong shape.
    #[error("invalid payload for '{capability}': {message}")]
    InvalidPayload { capability: String, message: String },

    /// The requested mode does not exist.
    #[error(transparent)]
    InvalidMode(#[from] ParseModeError),

    /// The backing task could not be started.
    #[error(transparent)]
    TaskRejected(#[from] TaskRunnerError),

    /// Any other handler failure.
    #[error("{0}")]
    Failed(String),
}

impl CapabilityError {
    pub fn invalid_payload(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            capability: capability.into(),
            message: message.into(),
        }
    }
}

impl ErrorCode for CapabilityError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload { .. } => "CAPABILITY_INVALID_PAYLOAD",
            Self::InvalidMode(_) => "CAPABILITY_INVALID_MODE",
            Self::TaskRejected(_) => "CAPABILITY_TASK_REJECTED",
            Self::Failed(_) => "CAPABILITY_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidPayload { .. } | Self::InvalidMode(_))
    }
}
