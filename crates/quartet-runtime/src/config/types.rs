//! Configuration types.
//!
//! Every section implements [`Default`]; a file only needs the keys it
//! changes.

use crate::engine::DEFAULT_MAX_LOG_CHARS;
use crate::task::DEFAULT_MAX_WORKERS;
use quartet_types::Mode;
use serde::{Deserialize, Serialize};

/// Merged configuration.
///
/// ```
/// use quartet_runtime::config::QuartetConfig;
/// use quartet_types::Mode;
///
/// let config = QuartetConfig::from_toml("[runtime]\ninitial_mode = \"debug\"").unwrap();
/// assert_eq!(config.runtime.initial_mode, Mode::Debug);
/// assert_eq!(config.runtime.max_workers, 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuartetConfig {
    /// Verbose logging.
    pub debug: bool,
    pub runtime: RuntimeConfig,
    pub debugging: DebuggingConfig,
    pub process: ProcessConfig,
    pub cli: CliConfig,
}

impl QuartetConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns the TOML error for malformed input or unknown enum values.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// # Errors
    ///
    /// Returns the serializer error if a value cannot be represented.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Applies every value of `other` that differs from the default.
    pub fn merge(&mut self, other: &Self) {
        if other.debug != Self::default().debug {
            self.debug = other.debug;
        }
        self.runtime.merge(&other.runtime);
        self.debugging.merge(&other.debugging);
        self.process.merge(&other.process);
        self.cli.merge(&other.cli);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Mode active at startup.
    pub initial_mode: Mode,
    /// Task pool size.
    pub max_workers: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_mode: Mode::Smart,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl RuntimeConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();
        if other.initial_mode != default.initial_mode {
            self.initial_mode = other.initial_mode;
        }
        if other.max_workers != default.max_workers {
            self.max_workers = other.max_workers;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggingConfig {
    /// Characters of log text included in agent prompts.
    pub max_log_chars: usize,
}

impl Default for DebuggingConfig {
    fn default() -> Self {
        Self {
            max_log_chars: DEFAULT_MAX_LOG_CHARS,
        }
    }
}

impl DebuggingConfig {
    fn merge(&mut self, other: &Self) {
        if other.max_log_chars != Self::default().max_log_chars {
            self.max_log_chars = other.max_log_chars;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Every monitored process reports a crash.
    pub simulate_crash: bool,
}

impl ProcessConfig {
    fn merge(&mut self, other: &Self) {
        if other.simulate_crash {
            self.simulate_crash = true;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Entries shown by `:transcript`.
    pub transcript_tail: usize,
    /// How long one-shot mode waits for spawned tasks.
    pub task_wait_ms: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            transcript_tail: 20,
            task_wait_ms: 5_000,
        }
    }
}

impl CliConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();
        if other.transcript_tail != default.transcript_tail {
            self.transcript_tail = other.transcript_tail;
        }
        if other.task_wait_ms != default.task_wait_ms {
            self.task_wait_ms = other.task_wait_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = QuartetConfig::default();
        assert!(!config.debug);
        assert_eq!(config.runtime.initial_mode, Mode::Smart);
        assert_eq!(config.runtime.max_workers, 4);
        assert_eq!(config.debugging.max_log_chars, 4000);
        assert!(!config.process.simulate_crash);
        assert_eq!(config.cli.task_wait_ms, 5_000);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = QuartetConfig::from_toml(
            r#"
[process]
simulate_crash = true

[cli]
transcript_tail = 5
"#,
        )
        .expect("valid toml");
        assert!(config.process.simulate_crash);
        assert_eq!(config.cli.transcript_tail, 5);
        assert_eq!(config.cli.task_wait_ms, 5_000);
        assert_eq!(config.runtime, RuntimeConfig::default());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(QuartetConfig::from_toml("[runtime]\ninitial_mode = \"turbo\"").is_err());
    }

    #[test]
    fn merge_only_overrides_non_defaults() {
        let mut base = QuartetConfig::default();
        base.runtime.max_workers = 8;
        base.debug = true;

        let mut layer = QuartetConfig::default();
        layer.runtime.initial_mode = Mode::Insight;
        base.merge(&layer);

        assert!(base.debug);
        assert_eq!(base.runtime.max_workers, 8);
        assert_eq!(base.runtime.initial_mode, Mode::Insight);
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = QuartetConfig::default();
        config.runtime.initial_mode = Mode::Automation;
        let text = config.to_toml().expect("serialize");
        assert!(text.contains("initial_mode = \"automation\""));
        assert_eq!(QuartetConfig::from_toml(&text).expect("parse"), config);
    }
}
