//! Layered configuration loading.
//!
//! # Load Order
//!
//! 1. Default values
//! 2. Global config (`~/.quartet/config.toml`)
//! 3. Project config (`<root>/.quartet/config.toml`)
//! 4. Environment variables (`QUARTET_*`)
//!
//! Each layer overrides the previous one.

use super::{default_config_path, ConfigError, QuartetConfig, PROJECT_CONFIG_DIR, PROJECT_CONFIG_FILE};
use quartet_types::Mode;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

macro_rules! parse_env_bool {
    ($field:expr, $var:literal) => {
        if let Ok(val) = std::env::var($var) {
            $field = parse_bool(&val)
                .ok_or_else(|| ConfigError::invalid_env_var($var, "expected bool"))?;
        }
    };
}

macro_rules! parse_env_number {
    ($field:expr, $var:literal) => {
        if let Ok(val) = std::env::var($var) {
            $field = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env_var($var, "expected non-negative integer"))?;
        }
    };
}

/// Builder for a layered [`QuartetConfig`] load.
///
/// ```no_run
/// use quartet_runtime::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_project_root(".")
///     .load()?;
/// # Ok::<(), quartet_runtime::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    global_config_path: Option<PathBuf>,
    project_root: Option<PathBuf>,
    skip_env: bool,
    skip_global: bool,
    skip_project: bool,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `path` instead of `~/.quartet/config.toml`.
    #[must_use]
    pub fn with_global_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Reads project config from `<path>/.quartet/config.toml`.
    #[must_use]
    pub fn with_project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    #[must_use]
    pub fn skip_global_config(mut self) -> Self {
        self.skip_global = true;
        self
    }

    #[must_use]
    pub fn skip_project_config(mut self) -> Self {
        self.skip_project = true;
        self
    }

    /// Loads and merges every enabled layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a config file exists but cannot be read or
    /// parsed, or an environment variable holds an invalid value. Missing
    /// files are skipped.
    pub fn load(&self) -> Result<QuartetConfig, ConfigError> {
        let mut config = QuartetConfig::default();

        if !self.skip_global {
            let path = self
                .global_config_path
                .clone()
                .unwrap_or_else(default_config_path);
            if let Some(global) = Self::load_file(&path)? {
                debug!(path = %path.display(), "Loaded global config");
                config.merge(&global);
            }
        }

        if !self.skip_project {
            if let Some(root) = &self.project_root {
                let path = root.join(PROJECT_CONFIG_DIR).join(PROJECT_CONFIG_FILE);
                if let Some(project) = Self::load_file(&path)? {
                    debug!(path = %path.display(), "Loaded project config");
                    config.merge(&project);
                }
            }
        }

        if !self.skip_env {
            Self::apply_env_vars(&mut config)?;
        }

        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Option<QuartetConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        QuartetConfig::from_toml(&content)
            .map(Some)
            .map_err(|e| ConfigError::parse_toml(path, e))
    }

    fn apply_env_vars(config: &mut QuartetConfig) -> Result<(), ConfigError> {
        parse_env_bool!(config.debug, "QUARTET_DEBUG");
        parse_env_bool!(config.process.simulate_crash, "QUARTET_SIMULATE_CRASH");
        parse_env_number!(config.runtime.max_workers, "QUARTET_MAX_WORKERS");
        parse_env_number!(config.debugging.max_log_chars, "QUARTET_MAX_LOG_CHARS");

        if let Ok(val) = std::env::var("QUARTET_MODE") {
            config.runtime.initial_mode = Mode::from_str(&val)
                .map_err(|e| ConfigError::invalid_env_var("QUARTET_MODE", e.to_string()))?;
        }
        Ok(())
    }
}

/// Accepts true/false, 1/0, yes/no and on/off, case-insensitively.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
