//! Runtime layer for quartet.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  workspace/  : WorkspaceRuntime, CommandSurface, loop       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  router      : mode gating in front of the registry         │
//! │  command/    : interpreter and contextual resolver          │
//! │  capability/ : named handlers and their categories          │
//! │  mode/       : ModeManager and ModeBehavior                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  task/       : bounded TaskRunner and TaskGraph             │
//! │  engine/     : process, automation, debugging, insight      │
//! │  session/    : state, transcript, health                    │
//! │  config/     : layered TOML + env configuration             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use quartet_runtime::workspace::{CommandSurface, WorkspaceRuntime};
//! use quartet_runtime::command::Payload;
//! use quartet_types::Mode;
//! use std::sync::Arc;
//!
//! let runtime = Arc::new(WorkspaceRuntime::builder().build().unwrap());
//! let surface = CommandSurface::new(Arc::clone(&runtime));
//!
//! let result = surface.submit("switch to debug mode", Payload::new(), None);
//! assert_eq!(result["mode"], "debug");
//! assert_eq!(runtime.modes().mode(), Mode::Debug);
//! ```

pub mod capability;
pub mod command;
pub mod config;
pub mod engine;
pub mod mode;
pub mod router;
pub mod session;
pub mod task;
pub mod workspace;

pub use workspace::{CommandSurface, WorkspaceLoop, WorkspaceRuntime};
