//! Unified error interface for quartet.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so that
//! callers at the outer boundary (the command surface, the CLI) can map
//! failures to stable machine-readable codes without matching on each
//! crate's concrete error type.
//!
//! # Example
//!
//! ```
//! use quartet_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum QueueError {
//!     Closed,
//!     Full,
//! }
//!
//! impl ErrorCode for QueueError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Closed => "QUEUE_CLOSED",
//!             Self::Full => "QUEUE_FULL",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Full)
//!     }
//! }
//!
//! let err = QueueError::Full;
//! assert_eq!(err.code(), "QUEUE_FULL");
//! assert!(err.is_recoverable());
//! ```

/// Machine-readable error classification.
///
/// # Code Format
///
/// - **UPPER_SNAKE_CASE**, e.g. `"TASK_NOT_REGISTERED"`
/// - **Prefixed by layer**: `EVENT_`, `MODE_`, `TASK_`, `CAPABILITY_`,
///   `ROUTER_`, `RUNTIME_`, `SURFACE_`, `LOOP_`, `CONFIG_`
/// - **Stable**: a code never changes once published
///
/// # Recoverability
///
/// An error is recoverable when the same call may succeed later or the
/// user can correct the input and retry. Invalid patterns, unknown task
/// names and malformed input are not recoverable.
pub trait ErrorCode {
    /// Returns the machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether retrying or correcting input may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code follows workspace conventions.
///
/// # Panics
///
/// Panics when the code is empty, lacks `expected_prefix`, or is not
/// UPPER_SNAKE_CASE.
///
/// # Example
///
/// ```
/// use quartet_types::{ErrorCode, assert_error_code};
///
/// #[derive(Debug)]
/// enum LoopError { Closed }
///
/// impl ErrorCode for LoopError {
///     fn code(&self) -> &'static str { "LOOP_CLOSED" }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_code(&LoopError::Closed, "LOOP_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Asserts [`assert_error_code`] for every listed variant.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum ProbeError {
        Busy,
        Broken,
    }

    impl ErrorCode for ProbeError {
        fn code(&self) -> &'static str {
            match self {
                Self::Busy => "PROBE_BUSY",
                Self::Broken => "PROBE_BROKEN",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Busy)
        }
    }

    #[test]
    fn code_and_recoverability() {
        assert_eq!(ProbeError::Busy.code(), "PROBE_BUSY");
        assert!(ProbeError::Busy.is_recoverable());
        assert!(!ProbeError::Broken.is_recoverable());
    }

    #[test]
    fn all_variants_pass_convention() {
        assert_error_codes(&[ProbeError::Busy, ProbeError::Broken], "PROBE_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn wrong_prefix_panics() {
        assert_error_code(&ProbeError::Busy, "TASK_");
    }

    #[test]
    fn upper_snake_case_rules() {
        assert!(is_upper_snake_case("TASK_NOT_REGISTERED"));
        assert!(is_upper_snake_case("E2"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("task"));
        assert!(!is_upper_snake_case("_TASK"));
        assert!(!is_upper_snake_case("TASK_"));
        assert!(!is_upper_snake_case("TASK__X"));
    }
}
