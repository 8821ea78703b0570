//! Crash diagnosis with optional agent escalation.

use super::agent::SharedAgent;
use super::prompt::DebugPromptBuilder;
use quartet_event::EventBus;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const SOURCE: &str = "debugging_engine";

const AGENT_NEXT_STEPS: [&str; 3] = [
    "Review agent suggestions",
    "Apply smallest safe change",
    "Re-run with monitoring",
];

const FALLBACK_NEXT_STEPS: [&str; 3] = [
    "Capture recent logs around the failure timestamp",
    "Record environment details (OS, versions, configs)",
    "Reproduce with minimal inputs",
];

/// How a diagnosis was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugStatus {
    Heuristic,
    Agent,
}

impl DebugStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heuristic => "heuristic",
            Self::Agent => "agent",
        }
    }
}

/// A diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugResult {
    pub status: DebugStatus,
    pub summary: String,
    pub suspected_root_causes: Vec<String>,
    pub next_steps: Vec<String>,
    pub used_agent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_output: Option<String>,
}

impl DebugResult {
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Diagnoses a failure described by `error_data`.
pub trait DebuggingEngine: Send + Sync {
    fn debug_error(
        &self,
        error_data: &Value,
        agent: Option<&SharedAgent>,
        context: &Value,
    ) -> DebugResult;
}

/// Keyword heuristics, escalating to an agent when one is supplied.
pub struct HeuristicDebugger {
    bus: Arc<EventBus>,
    prompts: DebugPromptBuilder,
}

impl HeuristicDebugger {
    #[must_use]
    pub fn new(bus: Arc<EventBus>, prompts: DebugPromptBuilder) -> Self {
        Self { bus, prompts }
    }

    fn escalate(
        &self,
        agent: &SharedAgent,
        error_data: &Value,
        context: &Value,
    ) -> Option<DebugResult> {
        let prompt = self.prompts.build(error_data, context);
        self.bus.publish(
            "debug.escalating",
            json!({"prompt_chars": prompt.user.chars().count()}),
            SOURCE,
        );
        match agent.generate(&prompt) {
            Ok(output) => {
                self.bus.publish(
                    "debug.agent_result",
                    json!({"chars": output.chars().count()}),
                    SOURCE,
                );
                Some(DebugResult {
                    status: DebugStatus::Agent,
                    summary: "Agent-assisted diagnosis".into(),
                    suspected_root_causes: vec!["Agent output attached".into()],
                    next_steps: AGENT_NEXT_STEPS.iter().map(|s| (*s).to_string()).collect(),
                    used_agent: true,
                    agent_output: Some(output),
                })
            }
            Err(e) => {
                warn!(error = %e, "Agent escalation failed, using heuristics");
                self.bus.publish(
                    "debug.agent_failed",
                    json!({"error": e.to_string()}),
                    SOURCE,
                );
                None
            }
        }
    }
}

impl DebuggingEngine for HeuristicDebugger {
    fn debug_error(
        &self,
        error_data: &Value,
        agent: Option<&SharedAgent>,
        context: &Value,
    ) -> DebugResult {
        let context_keys: Vec<&String> = context
            .as_object()
            .map(|obj| obj.keys().collect())
            .unwrap_or_default();
        self.bus.publish(
            "debug.invoked",
            json!({"has_agent": agent.is_some(), "context_keys": context_keys}),
            SOURCE,
        );

        match agent {
            Some(agent) => {
                if let Some(result) = self.escalate(agent, error_data, context) {
                    return result;
                }
            }
            None => {
                self.bus
                    .publish("debug.fallback", json!({"reason": "no_agent"}), SOURCE);
            }
        }
        let result = heuristic_diagnosis(error_data);
        debug!(causes = result.suspected_root_causes.len(), "Heuristic diagnosis");
        result
    }
}

/// Keyword rules over `error_type` and `message`.
#[must_use]
pub fn heuristic_diagnosis(error_data: &Value) -> DebugResult {
    let error_type = error_data
        .get("error_type")
        .and_then(Value::as_str)
        .unwrap_or("UnknownError");
    let message = error_data
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let haystack = format!("{error_type} {message}").to_lowercase();

    let mut causes = Vec::new();
    if haystack.contains("oom") || (haystack.contains("cuda") && haystack.contains("memory")) {
        causes.push("Out-of-memory condition".to_string());
    }
    if haystack.contains("permission") || haystack.contains("access denied") {
        causes.push("Permissions or access control issue".to_string());
    }
    if haystack.contains("timeout") || haystack.contains("timed out") {
        causes.push("Timeout / hung process".to_string());
    }
    if haystack.contains("not found") || haystack.contains("no such file") {
        causes.push("Missing file or incorrect path".to_string());
    }
    if causes.is_empty() {
        causes.push(format!("Generic failure: {error_type}"));
    }

    DebugResult {
        status: DebugStatus::Heuristic,
        summary: format!("Fallback diagnosis for {error_type}"),
        suspected_root_causes: causes,
        next_steps: FALLBACK_NEXT_STEPS.iter().map(|s| (*s).to_string()).collect(),
        used_agent: false,
        agent_output: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::agent::{agent_fn, AgentError};
    use quartet_event::Board;

    fn debugger() -> (HeuristicDebugger, Board) {
        let bus = Arc::new(EventBus::new());
        let board = Board::attach(&bus, "debug.*").expect("valid pattern");
        (HeuristicDebugger::new(bus, DebugPromptBuilder::default()), board)
    }

    #[test]
    fn keyword_rules() {
        let cases = [
            (json!({"error_type": "CudaError", "message": "CUDA out of memory"}), "Out-of-memory condition"),
            (json!({"message": "Permission denied"}), "Permissions or access control issue"),
            (json!({"message": "request timed out"}), "Timeout / hung process"),
            (json!({"message": "No such file or directory"}), "Missing file or incorrect path"),
        ];
        for (data, cause) in cases {
            let result = heuristic_diagnosis(&data);
            assert_eq!(result.suspected_root_causes, [cause], "{data}");
        }
    }

    #[test]
    fn generic_fallback_names_the_error_type() {
        let result = heuristic_diagnosis(&json!({"error_type": "SimulatedCrash"}));
        assert_eq!(result.summary, "Fallback diagnosis for SimulatedCrash");
        assert_eq!(result.suspected_root_causes, ["Generic failure: SimulatedCrash"]);
        assert_eq!(result.next_steps.len(), 3);

        let unknown = heuristic_diagnosis(&Value::Null);
        assert_eq!(unknown.summary, "Fallback diagnosis for UnknownError");
    }

    #[test]
    fn no_agent_falls_back() {
        let (debugger, board) = debugger();
        let result = debugger.debug_error(&json!({}), None, &json!({"mode": "debug"}));
        assert_eq!(result.status, DebugStatus::Heuristic);
        assert!(!result.used_agent);
        assert_eq!(board.names(), ["debug.invoked", "debug.fallback"]);
        assert_eq!(board.all()[0].payload["context_keys"], json!(["mode"]));
    }

    #[test]
    fn agent_output_is_attached() {
        let (debugger, board) = debugger();
        let agent = agent_fn(|prompt| Ok(format!("saw {} chars", prompt.user.len())));
        let result = debugger.debug_error(&json!({"message": "boom"}), Some(&agent), &json!({}));
        assert_eq!(result.status, DebugStatus::Agent);
        assert!(result.used_agent);
        assert!(result.agent_output.as_deref().is_some_and(|o| o.starts_with("saw ")));
        assert_eq!(
            board.names(),
            ["debug.invoked", "debug.escalating", "debug.agent_result"]
        );
        assert_eq!(result.to_value()["status"], json!("agent"));
    }

    #[test]
    fn agent_failure_falls_back_to_heuristics() {
        let (debugger, board) = debugger();
        let agent = agent_fn(|_| Err(AgentError::Unavailable("offline".into())));
        let result = debugger.debug_error(
            &json!({"message": "operation timeout"}),
            Some(&agent),
            &json!({}),
        );
        assert_eq!(result.status, DebugStatus::Heuristic);
        assert_eq!(result.suspected_root_causes, ["Timeout / hung process"]);
        assert_eq!(board.count("debug.agent_failed"), 1);
        assert!(result.to_value().get("agent_output").is_none());
    }
}
