//! Command + payload + mode to a capability name.
//!
//! # Priority Chain
//!
//! The first applicable rule wins:
//!
//! | # | Rule | Capability | Confidence | Reason |
//! |---|------|------------|-----------:|--------|
//! | 1 | payload `capability` is registered | that name | 1.0 | `explicit_payload` |
//! | 2 | kind `set_mode` with a target | `mode.set` | 1.0 | `set_mode_command` |
//! | 3 | debug keyword | `debug.debug_last_error` | 0.75 | `debug_keywords` |
//! | 4 | automation keyword | `automation.run_workflow` | 0.7 | `automation_keywords` |
//! | 5 | insight keyword | `insight.analyze` | 0.7 | `insight_keywords` |
//! | 6 | active mode default | per mode | 0.6 | `mode_default` |
//! | 7 | fallback | `process.monitor` | 0.55 | `fallback_process_monitor` |
//!
//! Rules 3-7 apply only when their capability is registered. Keyword text is
//! the payload `text` field when non-empty, otherwise the raw command, lowercased.

use super::{Command, CommandKind, Payload};
use crate::capability::CapabilityRegistry;
use quartet_types::Mode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Why a capability was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionReason {
    ExplicitPayload,
    SetModeCommand,
    DebugKeywords,
    AutomationKeywords,
    InsightKeywords,
    ModeDefault,
    FallbackProcessMonitor,
}

impl ResolutionReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExplicitPayload => "explicit_payload",
            Self::SetModeCommand => "set_mode_command",
            Self::DebugKeywords => "debug_keywords",
            Self::AutomationKeywords => "automation_keywords",
            Self::InsightKeywords => "insight_keywords",
            Self::ModeDefault => "mode_default",
            Self::FallbackProcessMonitor => "fallback_process_monitor",
        }
    }
}

impl fmt::Display for ResolutionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolver's choice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub capability: String,
    pub confidence: f64,
    pub reason: ResolutionReason,
}

impl Resolution {
    fn new(capability: &str, confidence: f64, reason: ResolutionReason) -> Self {
        Self {
            capability: capability.to_string(),
            confidence,
            reason,
        }
    }
}

struct KeywordRule {
    keywords: &'static [&'static str],
    capability: &'static str,
    confidence: f64,
    reason: ResolutionReason,
}

const KEYWORD_RULES: [KeywordRule; 3] = [
    KeywordRule {
        keywords: &["debug", "crash", "error", "stack", "trace", "exception"],
        capability: "debug.debug_last_error",
        confidence: 0.75,
        reason: ResolutionReason::DebugKeywords,
    },
    KeywordRule {
        keywords: &[
            "automate",
            "automation",
            "workflow",
            "run task",
            "execute",
            "batch",
        ],
        capability: "automation.run_workflow",
        confidence: 0.7,
        reason: ResolutionReason::AutomationKeywords,
    },
    KeywordRule {
        keywords: &[
            "insight",
            "analyze",
            "analyse",
            "summarize",
            "summary",
            "pattern",
        ],
        capability: "insight.analyze",
        confidence: 0.7,
        reason: ResolutionReason::InsightKeywords,
    },
];

/// Stateless resolver implementing the priority chain above.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextualResolver;

impl ContextualResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolves `command` to a registered capability, or `None`.
    #[must_use]
    pub fn resolve(
        &self,
        command: &Command,
        payload: &Payload,
        mode: Mode,
        registry: &CapabilityRegistry,
    ) -> Option<Resolution> {
        if let Some(name) = payload.get("capability").and_then(Value::as_str) {
            if registry.contains(name) {
                return Some(Resolution::new(name, 1.0, ResolutionReason::ExplicitPayload));
            }
        }

        if command.kind == CommandKind::SetMode && command.mode.is_some() {
            return Some(Resolution::new(
                "mode.set",
                1.0,
                ResolutionReason::SetModeCommand,
            ));
        }

        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(&command.raw)
            .to_lowercase();

        for rule in &KEYWORD_RULES {
            if rule.keywords.iter().any(|k| text.contains(k)) && registry.contains(rule.capability)
            {
                return Some(Resolution::new(rule.capability, rule.confidence, rule.reason));
            }
        }

        let default = match mode {
            Mode::Insight => Some("insight.analyze"),
            Mode::Automation => Some("automation.run_workflow"),
            Mode::Debug => Some("debug.debug_last_error"),
            Mode::Smart => None,
        };
        if let Some(name) = default.filter(|n| registry.contains(n)) {
            return Some(Resolution::new(name, 0.6, ResolutionReason::ModeDefault));
        }

        registry.contains("process.monitor").then(|| {
            Resolution::new(
                "process.monitor",
                0.55,
                ResolutionReason::FallbackProcessMonitor,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityError;
    use crate::command::interpret;
    use serde_json::json;

    fn registry(names: &[&str]) -> CapabilityRegistry {
        let registry = CapabilityRegistry::new();
        for name in names {
            registry.register_fn(
                name,
                |_: &Payload, _, _: &Command| -> Result<Value, CapabilityError> { Ok(json!({})) },
                "test",
            );
        }
        registry
    }

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap_or_default()
    }

    const ALL: [&str; 5] = [
        "mode.set",
        "process.monitor",
        "debug.debug_last_error",
        "automation.run_workflow",
        "insight.analyze",
    ];

    #[test]
    fn explicit_payload_wins() {
        let reg = registry(&ALL);
        let r = ContextualResolver::new()
            .resolve(
                &interpret("debug this crash"),
                &payload(json!({"capability": "insight.analyze"})),
                Mode::Smart,
                &reg,
            )
            .expect("resolved");
        assert_eq!(r.capability, "insight.analyze");
        assert_eq!(r.confidence, 1.0);
        assert_eq!(r.reason, ResolutionReason::ExplicitPayload);
    }

    #[test]
    fn unregistered_explicit_capability_falls_through() {
        let reg = registry(&ALL);
        let r = ContextualResolver::new()
            .resolve(
                &Command::unknown("show me a stack trace"),
                &payload(json!({"capability": "ghost.cap"})),
                Mode::Smart,
                &reg,
            )
            .expect("resolved");
        assert_eq!(r.reason, ResolutionReason::DebugKeywords);
    }

    #[test]
    fn set_mode_resolves_to_mode_set() {
        let reg = registry(&[]);
        let r = ContextualResolver::new()
            .resolve(
                &interpret("switch to insight mode"),
                &Payload::new(),
                Mode::Smart,
                &reg,
            )
            .expect("resolved");
        assert_eq!(r.capability, "mode.set");
        assert_eq!(r.reason, ResolutionReason::SetModeCommand);
    }

    #[test]
    fn keyword_rules_in_priority_order() {
        let reg = registry(&ALL);
        let resolver = ContextualResolver::new();
        let cases = [
            ("why did it crash", "debug.debug_last_error", 0.75),
            ("run task batch", "automation.run_workflow", 0.7),
            ("find a pattern", "insight.analyze", 0.7),
            // debug keywords outrank insight ones
            ("summarize the error", "debug.debug_last_error", 0.75),
        ];
        for (text, expected, confidence) in cases {
            let r = resolver
                .resolve(&Command::unknown(text), &Payload::new(), Mode::Smart, &reg)
                .expect("resolved");
            assert_eq!(r.capability, expected, "{text}");
            assert_eq!(r.confidence, confidence, "{text}");
        }
    }

    #[test]
    fn payload_text_overrides_raw() {
        let reg = registry(&ALL);
        let r = ContextualResolver::new()
            .resolve(
                &Command::unknown("hello"),
                &payload(json!({"text": "Automate the BATCH"})),
                Mode::Smart,
                &reg,
            )
            .expect("resolved");
        assert_eq!(r.reason, ResolutionReason::AutomationKeywords);

        let r = ContextualResolver::new()
            .resolve(
                &Command::unknown("stack overflow"),
                &payload(json!({"text": ""})),
                Mode::Smart,
                &reg,
            )
            .expect("resolved");
        assert_eq!(r.reason, ResolutionReason::DebugKeywords);
    }

    #[test]
    fn keyword_skipped_when_capability_missing() {
        let reg = registry(&["insight.analyze"]);
        let r = ContextualResolver::new()
            .resolve(&Command::unknown("crash"), &Payload::new(), Mode::Insight, &reg)
            .expect("resolved");
        assert_eq!(r.capability, "insight.analyze");
        assert_eq!(r.confidence, 0.6);
        assert_eq!(r.reason, ResolutionReason::ModeDefault);
    }

    #[test]
    fn mode_defaults_then_fallback() {
        let reg = registry(&ALL);
        let resolver = ContextualResolver::new();
        let plain = Command::unknown("hello there");

        let expect = [
            (Mode::Insight, "insight.analyze"),
            (Mode::Automation, "automation.run_workflow"),
            (Mode::Debug, "debug.debug_last_error"),
            (Mode::Smart, "process.monitor"),
        ];
        for (mode, capability) in expect {
            let r = resolver
                .resolve(&plain, &Payload::new(), mode, &reg)
                .expect("resolved");
            assert_eq!(r.capability, capability, "{mode}");
        }

        let r = resolver
            .resolve(&plain, &Payload::new(), Mode::Smart, &reg)
            .expect("resolved");
        assert_eq!(r.confidence, 0.55);
        assert_eq!(r.reason, ResolutionReason::FallbackProcessMonitor);
    }

    #[test]
    fn nothing_registered_resolves_to_none() {
        let reg = registry(&[]);
        assert!(ContextualResolver::new()
            .resolve(&Command::unknown("crash"), &Payload::new(), Mode::Debug, &reg)
            .is_none());
    }
}
