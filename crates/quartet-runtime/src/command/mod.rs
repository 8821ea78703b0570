//! Structured commands and their interpretation.
//!
//! ```text
//! "switch to debug mode" ──► CommandInterpreter ──► Command { kind: SetMode, mode: Debug }
//!                                                        │
//!                         payload + active mode ──► ContextualResolver ──► Resolution
//! ```

mod interpreter;
mod resolver;

pub use interpreter::{interpret, CommandInterpreter, MODE_SYNONYMS, SWITCH_VERBS};
pub use resolver::{ContextualResolver, Resolution, ResolutionReason};

use quartet_types::Mode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Capability payload: a JSON object.
pub type Payload = Map<String, Value>;

/// What a command asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Blank input.
    Noop,
    /// No mode phrase recognized.
    #[default]
    Unknown,
    /// Explicit request to switch modes.
    SetMode,
    /// A mode was mentioned without a switch request.
    MentionMode,
    /// Direct capability invocation.
    Capability,
}

impl CommandKind {
    /// snake_case tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Unknown => "unknown",
            Self::SetMode => "set_mode",
            Self::MentionMode => "mention_mode",
            Self::Capability => "capability",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An interpreted command.
///
/// The serialized form doubles as a structured surface input, so every
/// field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Command {
    /// Original input text.
    pub raw: String,
    /// Interpretation result.
    pub kind: CommandKind,
    /// Target or mentioned mode.
    pub mode: Option<Mode>,
    /// Interpretation confidence in `[0, 1]`.
    pub confidence: f64,
    /// Synonym phrase that matched, empty if none.
    pub matched_phrase: String,
}

impl Command {
    /// Blank input.
    #[must_use]
    pub fn noop(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            kind: CommandKind::Noop,
            mode: None,
            confidence: 1.0,
            matched_phrase: String::new(),
        }
    }

    /// Unrecognized input.
    #[must_use]
    pub fn unknown(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            kind: CommandKind::Unknown,
            mode: None,
            confidence: 0.0,
            matched_phrase: String::new(),
        }
    }

    /// Direct invocation of `capability`.
    #[must_use]
    pub fn capability(capability: &str) -> Self {
        Self {
            raw: format!("capability:{capability}"),
            kind: CommandKind::Capability,
            mode: None,
            confidence: 1.0,
            matched_phrase: String::new(),
        }
    }

    /// Explicit switch to `mode`.
    #[must_use]
    pub fn set_mode(mode: Mode) -> Self {
        Self {
            raw: format!("set mode {mode}"),
            kind: CommandKind::SetMode,
            mode: Some(mode),
            confidence: 1.0,
            matched_phrase: mode.as_str().to_string(),
        }
    }

    /// JSON form of the command.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "raw": self.raw,
            "kind": self.kind,
            "mode": self.mode,
            "confidence": self.confidence,
            "matched_phrase": self.matched_phrase,
        })
    }
}
