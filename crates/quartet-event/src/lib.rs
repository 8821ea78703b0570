//! Event layer for quartet.
//!
//! Every component reports what it does by publishing dotted events on a
//! shared [`EventBus`]. Subscribers select events with shell globs.
//!
//! # Event Taxonomy
//!
//! | Prefix | Published by |
//! |--------|--------------|
//! | `command.*` | command surface, workspace runtime |
//! | `task.*` | task runner |
//! | `mode.changed` | mode manager |
//! | `router.*`, `capability.*` | mode-aware router |
//! | `health.*` | runtime health |
//! | `process.*`, `automation.*`, `debug.*`, `insight.*` | engines |
//! | `loop.*` | workspace loop |
//!
//! # Example
//!
//! ```
//! use quartet_event::{Board, EventBus};
//! use serde_json::json;
//!
//! let bus = EventBus::new();
//! let board = Board::attach(&bus, "loop.*").unwrap();
//! bus.publish("loop.started", json!({}), "workspace_loop");
//! assert_eq!(board.names(), vec!["loop.started"]);
//! ```

mod board;
mod bus;
mod error;
mod event;

pub use board::{Board, DEFAULT_BOARD_CAPACITY};
pub use bus::{EventBus, EventHandler, EventPattern, HandlerResult, Subscription};
pub use error::{EventError, HandlerError};
pub use event::Event;
