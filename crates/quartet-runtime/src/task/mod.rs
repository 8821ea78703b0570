//! Task execution and declarative task graphs.

mod error;
mod graph;
mod runner;

pub use error::{TaskError, TaskRunnerError};
pub use graph::{RetryPolicy, TaskGraph, TaskNode, TimeoutPolicy};
pub use runner::{TaskArgs, TaskFn, TaskRecord, TaskRunner, TaskStatus, DEFAULT_MAX_WORKERS};
