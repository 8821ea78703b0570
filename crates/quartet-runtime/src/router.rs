//! Mode-aware capability routing.
//!
//! The router asks the [`ContextualResolver`] for a capability, checks the
//! capability family against the active mode's flags and invokes the
//! handler only when both succeed.
//!
//! | Family | Required flag |
//! |--------|---------------|
//! | `automation.*` | `enable_automation` |
//! | `debug.*` | `enable_debugging` |
//! | `insight.*` | `enable_insight` |
//! | anything else | none |
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`RouteError`] | `ROUTER_CAPABILITY_FAILED` | inherits the handler error |

use crate::capability::{CapabilityCategory, CapabilityError, CapabilityRegistry};
use crate::command::{Command, ContextualResolver, Payload};
use crate::engine::SharedAgent;
use crate::mode::ModeManager;
use quartet_event::EventBus;
use quartet_types::{ErrorCode, Mode, ModeFlags};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

const SOURCE: &str = "mode_aware_router";

/// What happened to a routed command.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// The handler ran. `result` is always a JSON object.
    Completed { capability: String, result: Value },
    /// No capability applies.
    Unroutable { command: Command },
    /// The active mode does not allow the capability family.
    Denied {
        reason: String,
        capability: String,
        mode: Mode,
    },
    /// Permitted but not registered.
    MissingCapability { capability: String },
}

impl RouteOutcome {
    #[must_use]
    pub fn status(&self) -> &str {
        match self {
            Self::Completed { result, .. } => {
                result.get("status").and_then(Value::as_str).unwrap_or("ok")
            }
            Self::Unroutable { .. } => "unroutable",
            Self::Denied { .. } => "denied",
            Self::MissingCapability { .. } => "missing_capability",
        }
    }

    /// External map form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Completed { result, .. } => result.clone(),
            Self::Unroutable { command } => json!({
                "status": "unroutable",
                "command": command.to_value(),
            }),
            Self::Denied {
                reason,
                capability,
                mode,
            } => json!({
                "status": "denied",
                "reason": reason,
                "capability": capability,
                "mode": mode,
            }),
            Self::MissingCapability { capability } => json!({
                "status": "missing_capability",
                "capability": capability,
            }),
        }
    }
}

/// A capability handler failed.
#[derive(Debug, Error)]
#[error("capability '{capability}' failed: {source}")]
pub struct RouteError {
    pub capability: String,
    #[source]
    pub source: CapabilityError,
}

impl ErrorCode for RouteError {
    fn code(&self) -> &'static str {
        "ROUTER_CAPABILITY_FAILED"
    }

    fn is_recoverable(&self) -> bool {
        self.source.is_recoverable()
    }
}

/// Flag gating `capability`, by [`CapabilityCategory`].
fn denial_reason(capability: &str, flags: ModeFlags) -> Option<&'static str> {
    match CapabilityCategory::classify(capability) {
        CapabilityCategory::Automation if !flags.enable_automation => Some("automation_disabled"),
        CapabilityCategory::Debug if !flags.enable_debugging => Some("debugging_disabled"),
        CapabilityCategory::Insight if !flags.enable_insight => Some("insight_disabled"),
        _ => None,
    }
}

pub struct ModeAwareRouter {
    capabilities: Arc<CapabilityRegistry>,
    bus: Arc<EventBus>,
    modes: Arc<ModeManager>,
    resolver: ContextualResolver,
}

impl ModeAwareRouter {
    #[must_use]
    pub fn new(
        capabilities: Arc<CapabilityRegistry>,
        bus: Arc<EventBus>,
        modes: Arc<ModeManager>,
    ) -> Self {
        Self {
            capabilities,
            bus,
            modes,
            resolver: ContextualResolver::new(),
        }
    }

    /// Resolves, gates and executes `command`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] only when the chosen handler fails. Routing
    /// failures are reported as [`RouteOutcome`] variants.
    pub fn route(
        &self,
        command: &Command,
        payload: &Payload,
        agent: Option<&SharedAgent>,
    ) -> Result<RouteOutcome, RouteError> {
        let mode = self.modes.mode();
        let Some(resolution) = self
            .resolver
            .resolve(command, payload, mode, &self.capabilities)
        else {
            debug!(raw = %command.raw, kind = %command.kind, "Command unroutable");
            self.bus.publish(
                "router.unroutable",
                json!({"raw": command.raw, "kind": command.kind}),
                SOURCE,
            );
            return Ok(RouteOutcome::Unroutable {
                command: command.clone(),
            });
        };

        let capability = resolution.capability;
        if let Some(reason) = denial_reason(&capability, self.modes.flags()) {
            info!(capability = %capability, mode = %mode, reason, "Capability denied");
            self.bus.publish(
                "router.denied",
                json!({"capability": capability, "mode": mode}),
                SOURCE,
            );
            return Ok(RouteOutcome::Denied {
                reason: reason.to_string(),
                capability,
                mode,
            });
        }

        let Some(handler) = self.capabilities.get(&capability) else {
            self.bus.publish(
                "capability.missing",
                json!({"name": capability}),
                SOURCE,
            );
            return Ok(RouteOutcome::MissingCapability { capability });
        };

        debug!(
            capability = %capability,
            confidence = resolution.confidence,
            reason = %resolution.reason,
            "Dispatching capability"
        );
        self.bus.publish(
            "capability.dispatch",
            json!({
                "name": capability,
                "confidence": resolution.confidence,
                "reason": resolution.reason,
            }),
            SOURCE,
        );

        match handler.execute(payload, agent, command) {
            Ok(result @ Value::Object(_)) => Ok(RouteOutcome::Completed { capability, result }),
            Ok(other) => Ok(RouteOutcome::Completed {
                result: json!({"status": "ok", "capability": capability, "result": other}),
                capability,
            }),
            Err(source) => Err(RouteError { capability, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionTranscript;
    use quartet_event::Board;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        router: ModeAwareRouter,
        registry: Arc<CapabilityRegistry>,
        modes: Arc<ModeManager>,
        board: Board,
    }

    fn fixture(mode: Mode) -> Fixture {
        let bus = Arc::new(EventBus::new());
        let board = Board::attach(&bus, "*").expect("valid pattern");
        let registry = Arc::new(CapabilityRegistry::new());
        let modes = Arc::new(ModeManager::new(
            mode,
            Arc::clone(&bus),
            Arc::new(SessionTranscript::new()),
        ));
        let router = ModeAwareRouter::new(Arc::clone(&registry), bus, Arc::clone(&modes));
        Fixture {
            router,
            registry,
            modes,
            board,
        }
    }

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => Payload::new(),
        }
    }

    #[test]
    fn smart_mode_denies_debugging_without_invoking_handler() {
        let fx = fixture(Mode::Smart);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        fx.registry.register_fn(
            "debug.debug_last_error",
            move |_, _, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"status": "ok"}))
            },
            "",
        );

        let outcome = fx
            .router
            .route(
                &Command::capability("debug.debug_last_error"),
                &payload(json!({"capability": "debug.debug_last_error"})),
                None,
            )
            .expect("routing never fails here");

        assert_eq!(
            outcome.to_value(),
            json!({
                "status": "denied",
                "reason": "debugging_disabled",
                "capability": "debug.debug_last_error",
                "mode": "smart",
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.board.count("router.denied"), 1);
        assert_eq!(fx.board.count("capability.dispatch"), 0);
    }

    #[test]
    fn nothing_registered_is_unroutable() {
        let fx = fixture(Mode::Smart);
        let outcome = fx
            .router
            .route(&Command::unknown("hello"), &Payload::new(), None)
            .expect("no handler");
        assert_eq!(outcome.status(), "unroutable");
        assert_eq!(outcome.to_value()["command"]["raw"], json!("hello"));
        assert_eq!(fx.board.names(), ["router.unroutable"]);
    }

    #[test]
    fn non_object_results_are_wrapped() {
        let fx = fixture(Mode::Insight);
        fx.registry
            .register_fn("insight.analyze", |_, _, _| Ok(json!(["a", "b"])), "");
        let outcome = fx
            .router
            .route(&Command::unknown("summarize"), &Payload::new(), None)
            .expect("handler ok");
        assert_eq!(
            outcome.to_value(),
            json!({"status": "ok", "capability": "insight.analyze", "result": ["a", "b"]})
        );

        let dispatch = &fx.board.all()[0];
        assert_eq!(dispatch.name, "capability.dispatch");
        assert_eq!(dispatch.payload["reason"], json!("insight_keywords"));
    }

    #[test]
    fn handler_failure_becomes_route_error() {
        let fx = fixture(Mode::Debug);
        fx.modes.set_mode(Mode::Debug, "test");
        fx.registry.register_fn(
            "debug.debug_last_error",
            |_, _, _| Err(CapabilityError::Failed("exploded".into())),
            "",
        );
        let err = fx
            .router
            .route(&Command::unknown("why did it crash"), &Payload::new(), None)
            .expect_err("handler fails");
        assert_eq!(err.capability, "debug.debug_last_error");
        assert_eq!(err.code(), "ROUTER_CAPABILITY_FAILED");
        assert!(err.to_string().contains("exploded"));
        assert_eq!(fx.board.count("capability.dispatch"), 1);
    }

    #[test]
    fn gating_by_family() {
        let smart = ModeFlags::defaults_for(Mode::Smart);
        assert_eq!(denial_reason("automation.run_workflow", smart), Some("automation_disabled"));
        assert_eq!(denial_reason("insight.analyze", smart), Some("insight_disabled"));
        assert_eq!(denial_reason("process.monitor", smart), None);
        assert_eq!(denial_reason("mode.set", ModeFlags::NONE), None);
        let automation = ModeFlags::defaults_for(Mode::Automation);
        assert_eq!(denial_reason("debug.debug_last_error", automation), None);
    }

    #[test]
    fn gating_ignores_case_and_padding() {
        let smart = ModeFlags::defaults_for(Mode::Smart);
        assert_eq!(denial_reason("Debug.x", smart), Some("debugging_disabled"));
        assert_eq!(denial_reason(" AUTOMATION.run ", smart), Some("automation_disabled"));
        assert_eq!(denial_reason("Insight.Analyze", smart), Some("insight_disabled"));
        assert_eq!(denial_reason("Process.Monitor", smart), None);
    }
}
