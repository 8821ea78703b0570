//! Debug prompt assembly for agent escalation.
//!
//! The user message has three sections:
//!
//! ```text
//! Crash Metadata:
//! {"error_type":"SimulatedCrash","exit_code":1,...}   <- sorted keys, `logs` excluded
//!
//! Context:
//! {"mode":"debug"}
//!
//! Log Excerpts:
//! <last max_log_chars characters of the newline-joined logs>
//! ```

use super::agent::AgentPrompt;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Default cap on included log text, in characters.
pub const DEFAULT_MAX_LOG_CHARS: usize = 4000;

const SYSTEM_MESSAGE: &str = "You are a debugging assistant. \
You receive structured crash metadata and log excerpts. \
Provide a focused diagnosis, likely root causes, and a safe next step plan. \
If information is missing, ask for the minimal missing details.";

/// Builds [`AgentPrompt`]s from crash data.
#[derive(Debug, Clone, Copy)]
pub struct DebugPromptBuilder {
    max_log_chars: usize,
}

impl DebugPromptBuilder {
    #[must_use]
    pub fn new(max_log_chars: usize) -> Self {
        Self { max_log_chars }
    }

    #[must_use]
    pub fn max_log_chars(&self) -> usize {
        self.max_log_chars
    }

    /// Builds the prompt for `error_data` (an object; other values are
    /// treated as empty) and `context`.
    #[must_use]
    pub fn build(&self, error_data: &Value, context: &Value) -> AgentPrompt {
        let empty = Map::new();
        let fields = error_data.as_object().unwrap_or(&empty);

        let metadata: BTreeMap<&String, &Value> = fields
            .iter()
            .filter(|(k, _)| k.as_str() != "logs")
            .collect();

        let log_text = fields
            .get("logs")
            .and_then(Value::as_array)
            .map(|lines| {
                lines
                    .iter()
                    .map(render_log_line)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();
        let log_text = tail_chars(&log_text, self.max_log_chars);

        let user = [
            "Crash Metadata:".to_string(),
            serde_json::to_string(&metadata).unwrap_or_default(),
            String::new(),
            "Context:".to_string(),
            context.to_string(),
            String::new(),
            "Log Excerpts:".to_string(),
            if log_text.is_empty() {
                "<no logs available>".to_string()
            } else {
                log_text.to_string()
            },
        ]
        .join("\n");

        debug!(
            has_logs = !log_text.is_empty(),
            max_log_chars = self.max_log_chars,
            "Built agent debug prompt"
        );

        AgentPrompt {
            system: SYSTEM_MESSAGE.to_string(),
            user,
            metadata: json!({
                "context": context,
                "error_data": error_data,
                "max_log_chars": self.max_log_chars,
            }),
        }
    }
}

impl Default for DebugPromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOG_CHARS)
    }
}

fn render_log_line(line: &Value) -> String {
    match line {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match obj.get("message").and_then(Value::as_str) {
            Some(message) => {
                let source = obj.get("source").and_then(Value::as_str).unwrap_or("log");
                format!("[{source}] {message}")
            }
            None => line.to_string(),
        },
        other => other.to_string(),
    }
}

/// Last `max` characters of `s`, on a char boundary.
fn tail_chars(s: &str, max: usize) -> &str {
    let count = s.chars().count();
    if count <= max {
        return s;
    }
    let skip = count - max;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}
