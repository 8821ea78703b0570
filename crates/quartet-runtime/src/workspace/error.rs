//! Workspace layer errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`RuntimeError::TaskPool`] | `RUNTIME_TASK_POOL` | No |
//! | [`RuntimeError::Listener`] | `RUNTIME_LISTENER` | No |
//! | [`DispatchError::Capability`] | `RUNTIME_CAPABILITY_FAILED` | inherits |
//! | [`SurfaceError::InvalidInput`] | `SURFACE_INVALID_INPUT` | Yes |
//! | [`SurfaceError::Dispatch`] | `SURFACE_DISPATCH_FAILED` | inherits |
//! | [`LoopError::Closed`] | `LOOP_CLOSED` | No |

use crate::router::RouteError;
use crate::task::TaskRunnerError;
use quartet_event::EventError;
use quartet_types::ErrorCode;
use thiserror::Error;

/// The runtime could not be assembled.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    TaskPool(#[from] TaskRunnerError),

    #[error("failed to install runtime listener: {0}")]
    Listener(#[from] EventError),
}

impl ErrorCode for RuntimeError {
    fn code(&self) -> &'static str {
        match self {
            Self::TaskPool(_) => "RUNTIME_TASK_POOL",
            Self::Listener(_) => "RUNTIME_LISTENER",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// A dispatched command failed inside its capability.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Capability(#[from] RouteError),
}

impl DispatchError {
    /// Name of the capability that failed.
    #[must_use]
    pub fn capability(&self) -> &str {
        match self {
            Self::Capability(e) => &e.capability,
        }
    }
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            Self::Capability(_) => "RUNTIME_CAPABILITY_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Capability(e) => e.is_recoverable(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    /// Structured input has the wrong shape.
    #[error("invalid command input: {message}")]
    InvalidInput { message: String },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl SurfaceError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

impl ErrorCode for SurfaceError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "SURFACE_INVALID_INPUT",
            Self::Dispatch(_) => "SURFACE_DISPATCH_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidInput { .. } => true,
            Self::Dispatch(e) => e.is_recoverable(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LoopError {
    /// The loop that owned the queue is gone.
    #[error("workspace loop closed")]
    Closed,
}

impl ErrorCode for LoopError {
    fn code(&self) -> &'static str {
        match self {
            Self::Closed => "LOOP_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
