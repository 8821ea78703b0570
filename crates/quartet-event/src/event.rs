//! The [`Event`] record produced by every publish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A published occurrence.
///
/// Events are created by [`EventBus::publish`](crate::EventBus::publish)
/// and handed to matching subscribers by reference. The bus itself does not
/// retain them; attach a [`Board`](crate::Board) for that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Dotted name, e.g. `task.started`.
    pub name: String,
    /// Event body. Always a JSON object for events emitted by quartet.
    pub payload: Value,
    /// Component that published the event, e.g. `task_runner`.
    pub source: String,
    /// Publish time.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Value, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload,
            source: source.into(),
            timestamp: Utc::now(),
        }
    }

    /// Looks up a top-level payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Looks up a top-level payload field as a string.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_accessors() {
        let event = Event::new(
            "task.error",
            json!({"task_id": "abc", "count": 2}),
            "task_runner",
        );
        assert_eq!(event.str_field("task_id"), Some("abc"));
        assert_eq!(event.field("count"), Some(&json!(2)));
        assert_eq!(event.str_field("count"), None);
        assert!(event.field("missing").is_none());
    }
}
