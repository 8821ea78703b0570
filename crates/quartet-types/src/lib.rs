//! Core types for quartet.
//!
//! quartet is a single-process control core for a four-mode assistant
//! backend. This crate holds the vocabulary every other crate shares.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  quartet-types   : Mode, ModeFlags, ids, ErrorCode  ◄── HERE │
//! │  quartet-event   : Event, EventBus                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  quartet-runtime : modes, capabilities, routing, tasks,     │
//! │                    session, workspace runtime and loop      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  quartet-cli     : `quartet` binary                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use quartet_types::{Mode, ModeFlags, TaskId};
//!
//! let mode: Mode = "automation".parse().unwrap();
//! assert!(ModeFlags::defaults_for(mode).enable_automation);
//!
//! let task = TaskId::new();
//! println!("submitted {task}");
//! ```

mod error;
mod id;
mod mode;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{SubscriptionId, TaskId};
pub use mode::{Mode, ModeFlags, ParseModeError};
