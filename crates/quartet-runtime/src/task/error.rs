//! Task errors.

use quartet_types::ErrorCode;
use thiserror::Error;

/// Failure of a task body. Captured into the task record, never returned
/// to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Cancellation was requested before the body started.
    #[error("task cancelled before start")]
    Cancelled,

    #[error("invalid task parameters: {message}")]
    InvalidParams { message: String },

    #[error("{0}")]
    Failed(String),

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }
}

impl ErrorCode for TaskError {
    fn code(&self) -> &'static str {
        match self {
            Self::Cancelled => "TASK_CANCELLED",
            Self::InvalidParams { .. } => "TASK_INVALID_PARAMS",
            Self::Failed(_) => "TASK_FAILED",
            Self::Panicked(_) => "TASK_PANICKED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Cancelled | Self::InvalidParams { .. })
    }
}

/// Submission failure, returned directly by the runner.
#[derive(Debug, Error)]
pub enum TaskRunnerError {
    #[error("task not registered: {name}")]
    NotRegistered { name: String },

    /// The worker pool could not be started.
    #[error("failed to start task pool: {0}")]
    PoolStartup(#[source] std::io::Error),
}

impl ErrorCode for TaskRunnerError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotRegistered { .. } => "TASK_NOT_REGISTERED",
            Self::PoolStartup(_) => "TASK_POOL_STARTUP",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
