//! The assembled system: runtime, command surface and workspace loop.
//!
//! ```text
//! enqueue ──► WorkspaceLoop ──► CommandSurface ──► WorkspaceRuntime::dispatch
//!                                 (text, Command,        │
//!                                  structured map)       ▼
//!                                                ModeAwareRouter ──► tasks
//! ```

mod builtin;
mod error;
mod outcome;
mod runtime;
mod surface;
mod workloop;

pub use builtin::{
    DEBUG_LAST_ERROR_TASK, INSIGHT_ANALYZE_TASK, MONITOR_PROCESS_TASK, RUN_WORKFLOW_TASK,
};
pub use error::{DispatchError, LoopError, RuntimeError, SurfaceError};
pub use outcome::DispatchOutcome;
pub use runtime::{RuntimeStatus, WorkspaceRuntime, WorkspaceRuntimeBuilder};
pub use surface::{CommandInput, CommandSurface};
pub use workloop::{LoopHandle, WorkspaceLoop};
