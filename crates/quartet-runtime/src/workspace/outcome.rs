use crate::router::RouteOutcome;
use serde_json::{json, Value};

/// Result of [`WorkspaceRuntime::dispatch`](super::WorkspaceRuntime::dispatch).
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Blank input; nothing was routed.
    Noop,
    /// The input was not understood.
    Unknown { raw: String },
    Routed(RouteOutcome),
}

impl DispatchOutcome {
    #[must_use]
    pub fn status(&self) -> &str {
        match self {
            Self::Noop => "noop",
            Self::Unknown { .. } => "unknown",
            Self::Routed(outcome) => outcome.status(),
        }
    }

    /// External map form, always carrying `status`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Noop => json!({"status": "noop"}),
            Self::Unknown { raw } => json!({"status": "unknown", "raw": raw}),
            Self::Routed(outcome) => outcome.to_value(),
        }
    }
}

impl From<RouteOutcome> for DispatchOutcome {
    fn from(outcome: RouteOutcome) -> Self {
        Self::Routed(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(DispatchOutcome::Noop.to_value(), json!({"status": "noop"}));
        let unknown = DispatchOutcome::Unknown { raw: "joke".into() };
        assert_eq!(unknown.status(), "unknown");
        assert_eq!(unknown.to_value()["raw"], json!("joke"));

        let routed = DispatchOutcome::from(RouteOutcome::Completed {
            capability: "mode.set".into(),
            result: json!({"status": "ok", "mode": "debug"}),
        });
        assert_eq!(routed.status(), "ok");
        assert_eq!(routed.to_value()["mode"], json!("debug"));
    }
}
