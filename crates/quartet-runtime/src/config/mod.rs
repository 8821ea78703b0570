//! Configuration with hierarchical layering.
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌──────────────────────────────────────────────┐
//! │  1. Environment Variables (QUARTET_*)        │
//! ├──────────────────────────────────────────────┤
//! │  2. Project Config (.quartet/config.toml)    │
//! ├──────────────────────────────────────────────┤
//! │  3. Global Config (~/.quartet/config.toml)   │
//! ├──────────────────────────────────────────────┤
//! │  4. Default Values                           │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `QUARTET_DEBUG` | `debug` | bool |
//! | `QUARTET_MODE` | `runtime.initial_mode` | mode name |
//! | `QUARTET_MAX_WORKERS` | `runtime.max_workers` | usize |
//! | `QUARTET_MAX_LOG_CHARS` | `debugging.max_log_chars` | usize |
//! | `QUARTET_SIMULATE_CRASH` | `process.simulate_crash` | bool |
//!
//! # Example Configuration
//!
//! ```toml
//! debug = false
//!
//! [runtime]
//! initial_mode = "smart"
//! max_workers = 4
//!
//! [debugging]
//! max_log_chars = 4000
//!
//! [process]
//! simulate_crash = false
//!
//! [cli]
//! transcript_tail = 20
//! task_wait_ms = 5000
//! ```

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{CliConfig, DebuggingConfig, ProcessConfig, QuartetConfig, RuntimeConfig};

use std::path::PathBuf;

/// Project config directory name.
pub const PROJECT_CONFIG_DIR: &str = ".quartet";

pub const PROJECT_CONFIG_FILE: &str = "config.toml";

/// `~/.quartet`, or `./.quartet` when no home directory is known.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PROJECT_CONFIG_DIR)
}

#[must_use]
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(PROJECT_CONFIG_FILE)
}
