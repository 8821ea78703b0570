//! Uniform entry point for text, commands and structured maps.

use super::error::SurfaceError;
use super::outcome::DispatchOutcome;
use super::runtime::WorkspaceRuntime;
use crate::command::{Command, CommandInterpreter, Payload};
use crate::engine::SharedAgent;
use quartet_types::ErrorCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const SOURCE: &str = "command_surface";

/// Anything the surface accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandInput {
    /// Free text, interpreted before dispatch.
    Text(String),
    /// An already interpreted command.
    Command(Command),
    /// `{capability, payload}` or a serialized [`Command`].
    Structured(Payload),
}

impl CommandInput {
    /// Classifies a JSON value: strings are text, objects are structured.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InvalidInput`] for any other JSON type.
    pub fn from_value(value: Value) -> Result<Self, SurfaceError> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Object(map) => Ok(Self::Structured(map)),
            other => Err(SurfaceError::invalid_input(format!(
                "expected text or an object, got {other}"
            ))),
        }
    }

    /// Tag used in `command.received` and loop events.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Command(_) => "command",
            Self::Structured(_) => "structured",
        }
    }
}

impl From<&str> for CommandInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for CommandInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Command> for CommandInput {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

impl From<Payload> for CommandInput {
    fn from(map: Payload) -> Self {
        Self::Structured(map)
    }
}

/// Normalizes input, dispatches it and always answers with a map.
pub struct CommandSurface {
    runtime: Arc<WorkspaceRuntime>,
}

impl CommandSurface {
    #[must_use]
    pub fn new(runtime: Arc<WorkspaceRuntime>) -> Self {
        Self { runtime }
    }

    #[must_use]
    pub fn runtime(&self) -> &Arc<WorkspaceRuntime> {
        &self.runtime
    }

    /// Submits one input. Failures come back as `{status: error, error}`.
    pub fn submit(
        &self,
        input: impl Into<CommandInput>,
        payload: Payload,
        agent: Option<&SharedAgent>,
    ) -> Value {
        let input = input.into();
        let bus = self.runtime.bus();
        bus.publish("command.received", json!({"type": input.kind_name()}), SOURCE);

        match self.try_submit(input, payload, agent) {
            Ok(outcome) => {
                bus.publish("command.result", json!({"status": outcome.status()}), SOURCE);
                outcome.to_value()
            }
            Err(e) => {
                let error = e.to_string();
                warn!(code = e.code(), error = %error, "Command failed");
                bus.publish(
                    "command.error",
                    json!({"error": error, "code": e.code()}),
                    SOURCE,
                );
                json!({"status": "error", "error": error})
            }
        }
    }

    fn try_submit(
        &self,
        input: CommandInput,
        payload: Payload,
        agent: Option<&SharedAgent>,
    ) -> Result<DispatchOutcome, SurfaceError> {
        let (command, payload) = match input {
            CommandInput::Text(text) => {
                let command = CommandInterpreter::interpret(&text);
                let mut payload = payload;
                payload
                    .entry("text")
                    .or_insert_with(|| Value::String(text));
                (command, payload)
            }
            CommandInput::Command(command) => (command, payload),
            CommandInput::Structured(map) => structured(map, payload)?,
        };
        debug!(kind = %command.kind, raw = %command.raw, "Submitting command");
        Ok(self.runtime.dispatch(&command, agent, payload)?)
    }
}

fn structured(mut map: Payload, base: Payload) -> Result<(Command, Payload), SurfaceError> {
    let Some(capability) = map.remove("capability") else {
        let command = serde_json::from_value(Value::Object(map))
            .map_err(|e| SurfaceError::invalid_input(format!("not a command: {e}")))?;
        return Ok((command, base));
    };
    let Value::String(name) = capability else {
        return Err(SurfaceError::invalid_input("capability must be a string"));
    };

    // Caller-supplied keys take precedence over the map's own payload.
    let mut payload = match map.remove("payload") {
        None | Some(Value::Null) => Payload::new(),
        Some(Value::Object(inner)) => inner,
        Some(_) => return Err(SurfaceError::invalid_input("payload must be an object")),
    };
    payload.extend(base);
    payload.insert("capability".into(), Value::String(name.clone()));
    Ok((Command::capability(&name), payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quartet_event::{Board, EventBus};
    use quartet_types::Mode;

    fn surface() -> (CommandSurface, Board) {
        let bus = Arc::new(EventBus::new());
        let board = Board::attach(&bus, "command.*").expect("valid pattern");
        let runtime = WorkspaceRuntime::builder()
            .with_bus(bus)
            .max_workers(1)
            .build()
            .expect("runtime");
        (CommandSurface::new(Arc::new(runtime)), board)
    }

    fn map(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => Payload::new(),
        }
    }

    #[test]
    fn from_value_classifies() {
        assert_eq!(
            CommandInput::from_value(json!("hi")).expect("text"),
            CommandInput::Text("hi".into())
        );
        assert_eq!(
            CommandInput::from_value(json!({"capability": "x"}))
                .expect("map")
                .kind_name(),
            "structured"
        );
        assert!(CommandInput::from_value(json!(42)).is_err());
    }

    #[test]
    fn text_switches_mode_through_router() {
        let (surface, board) = surface();
        let result = surface.submit("switch to debug mode", Payload::new(), None);
        assert_eq!(result, json!({"status": "ok", "mode": "debug"}));
        assert_eq!(surface.runtime().modes().mode(), Mode::Debug);
        assert_eq!(board.names()[0], "command.received");
        assert_eq!(board.count("command.result"), 1);
    }

    #[test]
    fn structured_capability_uses_inner_payload() {
        let (surface, _board) = surface();
        let result = surface.submit(
            map(json!({"capability": "mode.set", "payload": {"mode": "insight"}})),
            Payload::new(),
            None,
        );
        assert_eq!(result["mode"], json!("insight"));
    }

    #[test]
    fn caller_payload_overrides_structured_payload() {
        let (surface, _board) = surface();
        let result = surface.submit(
            map(json!({"capability": "mode.set", "payload": {"mode": "insight", "note": "kept"}})),
            map(json!({"mode": "debug"})),
            None,
        );
        assert_eq!(result, json!({"status": "ok", "mode": "debug"}));
        assert_eq!(surface.runtime().modes().mode(), Mode::Debug);

        let (command, payload) = structured(
            map(json!({"capability": "insight.analyze", "payload": {"text": "inner", "note": "kept"}})),
            map(json!({"text": "outer"})),
        )
        .expect("structured");
        assert_eq!(command.raw, "capability:insight.analyze");
        assert_eq!(payload["text"], json!("outer"));
        assert_eq!(payload["note"], json!("kept"));
    }

    #[test]
    fn serialized_command_is_accepted() {
        let (surface, _board) = surface();
        let command = Command::set_mode(Mode::Automation);
        let result = surface.submit(map(command.to_value()), Payload::new(), None);
        assert_eq!(result, json!({"status": "ok", "mode": "automation"}));
    }

    #[test]
    fn malformed_input_becomes_error_map() {
        let (surface, board) = surface();
        let result = surface.submit(map(json!({"capability": 7})), Payload::new(), None);
        assert_eq!(result["status"], json!("error"));
        assert!(result["error"]
            .as_str()
            .is_some_and(|e| e.contains("capability must be a string")));

        let result = surface.submit(
            map(json!({"capability": "mode.set", "payload": [1]})),
            Payload::new(),
            None,
        );
        assert_eq!(result["status"], json!("error"));
        assert_eq!(board.count("command.error"), 2);
    }

    #[test]
    fn capability_failure_becomes_error_map() {
        let (surface, _board) = surface();
        let result = surface.submit(
            map(json!({"capability": "mode.set", "payload": {"mode": "turbo"}})),
            Payload::new(),
            None,
        );
        assert_eq!(result["status"], json!("error"));
        assert!(result["error"]
            .as_str()
            .is_some_and(|e| e.contains("mode.set")));
    }

    #[test]
    fn smart_mode_denies_debugging() {
        let (surface, _board) = surface();
        let result = surface.submit(
            map(json!({"capability": "debug.debug_last_error"})),
            Payload::new(),
            None,
        );
        assert_eq!(result["status"], json!("denied"));
        assert_eq!(result["mode"], json!("smart"));
    }
}
