//! Append-only audit log of runtime activity.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Category of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    /// A command entered the runtime.
    Command,
    /// A command produced a (non-error) result.
    Result,
    /// Something failed.
    Error,
    /// Mode changed or mode flags were evaluated.
    Mode,
    /// A task was started.
    Task,
    /// Engine health changed.
    Health,
}

impl TranscriptKind {
    /// Lowercase tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Result => "result",
            Self::Error => "error",
            Self::Mode => "mode",
            Self::Task => "task",
            Self::Health => "health",
        }
    }
}

impl fmt::Display for TranscriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable transcript line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
    /// Entry category.
    pub kind: TranscriptKind,
    /// Human-readable message.
    pub message: String,
    /// Structured detail.
    pub data: Value,
}

/// Time-ordered, append-only log.
///
/// Entries are never mutated; the only removal is a wholesale [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct SessionTranscript {
    entries: RwLock<Vec<TranscriptEntry>>,
}

impl SessionTranscript {
    /// Creates an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Appends an entry and returns a copy of it.
    pub fn append(
        &self,
        kind: TranscriptKind,
        message: impl Into<String>,
        data: Value,
    ) -> TranscriptEntry {
        let entry = TranscriptEntry {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            data,
        };
        self.entries.write().push(entry.clone());
        entry
    }

    /// Returns the last `limit` entries, oldest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<TranscriptEntry> {
        let entries = self.entries.read();
        let skip = entries.len().saturating_sub(limit);
        entries[skip..].to_vec()
    }

    /// Returns every entry, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<TranscriptEntry> {
        self.entries.read().clone()
    }

    /// Number of entries of `kind`.
    #[must_use]
    pub fn count(&self, kind: TranscriptKind) -> usize {
        self.entries.read().iter().filter(|e| e.kind == kind).count()
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing was appended since the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
