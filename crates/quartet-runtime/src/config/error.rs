//! Configuration errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`ConfigError::ReadFile`] | `CONFIG_READ_FILE` | No |
//! | [`ConfigError::ParseToml`] | `CONFIG_PARSE_TOML` | No |
//! | [`ConfigError::InvalidEnvVar`] | `CONFIG_INVALID_ENV_VAR` | Yes |

use quartet_types::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar { name: String, message: String },
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "CONFIG_READ_FILE",
            Self::ParseToml { .. } => "CONFIG_PARSE_TOML",
            Self::InvalidEnvVar { .. } => "CONFIG_INVALID_ENV_VAR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidEnvVar { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quartet_types::assert_error_codes;

    #[test]
    fn all_error_codes_valid() {
        let parse_err = toml::from_str::<toml::Value>("= broken").expect_err("invalid toml");
        assert_error_codes(
            &[
                ConfigError::read_file("/x", std::io::Error::other("denied")),
                ConfigError::parse_toml("/x", parse_err),
                ConfigError::invalid_env_var("QUARTET_MODE", "unknown mode"),
            ],
            "CONFIG_",
        );
    }
}
