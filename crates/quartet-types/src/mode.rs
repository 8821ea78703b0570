//! Operating modes and their behavior flags.
//!
//! Exactly one [`Mode`] is active at a time. Each mode carries a static
//! set of [`ModeFlags`] that gate which capability families may run:
//!
//! | Mode | escalation | process | debugging | automation | insight | verbose |
//! |------|:---:|:---:|:---:|:---:|:---:|:---:|
//! | Smart | - | ✓ | - | - | - | - |
//! | Debug | ✓ | ✓ | ✓ | - | - | ✓ |
//! | Automation | ✓ | ✓ | ✓ | ✓ | - | ✓ |
//! | Insight | - | - | - | - | ✓ | - |

use crate::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The single globally active operating stance.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// General assistant behavior.
    #[default]
    Smart,
    /// Crash diagnosis, optionally escalated to an agent.
    Debug,
    /// Workflow execution with debugging support.
    Automation,
    /// Analysis and summarization.
    Insight,
}

impl Mode {
    /// All modes in declaration order.
    pub const ALL: [Mode; 4] = [Mode::Smart, Mode::Debug, Mode::Automation, Mode::Insight];

    /// Returns the lowercase wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Debug => "debug",
            Self::Automation => "automation",
            Self::Insight => "insight",
        }
    }

    /// Returns the static default flags for this mode.
    #[must_use]
    pub fn default_flags(&self) -> ModeFlags {
        ModeFlags::defaults_for(*self)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smart" => Ok(Self::Smart),
            "debug" => Ok(Self::Debug),
            "automation" => Ok(Self::Automation),
            "insight" => Ok(Self::Insight),
            _ => Err(ParseModeError {
                input: s.to_string(),
            }),
        }
    }
}

/// Returned when a string does not name a [`Mode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode '{input}' (expected smart, debug, automation or insight)")]
pub struct ParseModeError {
    /// The rejected input.
    pub input: String,
}

impl ErrorCode for ParseModeError {
    fn code(&self) -> &'static str {
        "MODE_UNKNOWN"
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Per-mode behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModeFlags {
    /// Debugging may escalate to an external agent.
    pub allow_agent_escalation: bool,
    /// `process.*` work is expected in this mode.
    pub enable_process_monitor: bool,
    /// `debug.*` capabilities may run.
    pub enable_debugging: bool,
    /// `automation.*` capabilities may run.
    pub enable_automation: bool,
    /// `insight.*` capabilities may run.
    pub enable_insight: bool,
    /// Emit extra diagnostic detail.
    pub verbose_debug: bool,
}

impl ModeFlags {
    /// All switches off.
    pub const NONE: ModeFlags = ModeFlags {
        allow_agent_escalation: false,
        enable_process_monitor: false,
        enable_debugging: false,
        enable_automation: false,
        enable_insight: false,
        verbose_debug: false,
    };

    /// Static defaults for `mode`.
    #[must_use]
    pub const fn defaults_for(mode: Mode) -> Self {
        match mode {
            Mode::Smart => Self {
                enable_process_monitor: true,
                ..Self::NONE
            },
            Mode::Debug => Self {
                allow_agent_escalation: true,
                enable_process_monitor: true,
                enable_debugging: true,
                verbose_debug: true,
                ..Self::NONE
            },
            Mode::Automation => Self {
                allow_agent_escalation: true,
                enable_process_monitor: true,
                enable_debugging: true,
                enable_automation: true,
                verbose_debug: true,
                ..Self::NONE
            },
            Mode::Insight => Self {
                enable_insight: true,
                ..Self::NONE
            },
        }
    }
}
