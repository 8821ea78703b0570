//! Identifier types.
//!
//! All identifiers are random UUID v4 newtypes. They serialize as plain
//! UUID strings and display with a short kind prefix for logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a task submitted to the task runner.
///
/// Generated once at submission; a task that was never accepted has no id.
///
/// # Example
///
/// ```
/// use quartet_types::TaskId;
///
/// let a = TaskId::new();
/// let b = TaskId::new();
/// assert_ne!(a, b);
/// assert!(a.to_string().starts_with("task:"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

#[allow(clippy::new_without_default)] // ids are only minted by the task runner
impl TaskId {
    /// Creates a new [`TaskId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task:{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    /// Accepts either the bare UUID or the `task:` display form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("task:").unwrap_or(s);
        Uuid::parse_str(raw).map(Self)
    }
}

/// Identifier of an event bus subscription.
///
/// # Example
///
/// ```
/// use quartet_types::SubscriptionId;
///
/// let id = SubscriptionId::new();
/// assert_eq!(id.uuid(), id.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub Uuid);

#[allow(clippy::new_without_default)]
impl SubscriptionId {
    /// Creates a new [`SubscriptionId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_serializes_as_bare_uuid() {
        let id = TaskId::new();
        let json = serde_json::to_string(&id).expect("serialize task id");
        assert_eq!(json, format!("\"{}\"", id.uuid()));
    }

    #[test]
    fn task_id_parses_both_forms() {
        let id = TaskId::new();
        assert_eq!(id.to_string().parse::<TaskId>().ok(), Some(id));
        assert_eq!(id.uuid().to_string().parse::<TaskId>().ok(), Some(id));
        assert!("task:nope".parse::<TaskId>().is_err());
    }

    #[test]
    fn subscription_display_prefix() {
        let id = SubscriptionId::new();
        assert_eq!(id.to_string(), format!("sub:{}", id.0));
    }
}
