//! Event bus errors.

use quartet_types::ErrorCode;
use thiserror::Error;

/// Errors returned by [`EventBus`](crate::EventBus) operations.
#[derive(Debug, Clone, Error)]
pub enum EventError {
    /// The subscription pattern is not a valid shell glob.
    #[error("invalid event pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Parser message.
        message: String,
    },
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidPattern { .. } => "EVENT_INVALID_PATTERN",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Failure reported by an event handler.
///
/// Handler failures never reach the publisher; the bus logs them and keeps
/// delivering.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Creates a handler error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quartet_types::assert_error_codes;

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[EventError::InvalidPattern {
                pattern: "[".into(),
                message: "unclosed".into(),
            }],
            "EVENT_",
        );
    }

    #[test]
    fn display_names_pattern() {
        let err = EventError::InvalidPattern {
            pattern: "task.[".into(),
            message: "invalid range".into(),
        };
        assert!(err.to_string().contains("task.["));
    }
}
