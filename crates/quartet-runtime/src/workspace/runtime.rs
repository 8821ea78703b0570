//! The assembled runtime.
//!
//! [`WorkspaceRuntime`] owns every service and wires them together once:
//!
//! ```text
//! dispatch(command)
//!    │
//!    ├─► ModeAwareRouter ─► ContextualResolver ─► CapabilityRegistry
//!    │                                                  │
//!    │                                    TaskRunner ◄──┘
//!    │                                        │
//!    │                     engines (process, automation, debugging, insight)
//!    │
//!    └─► SessionState / SessionTranscript / RuntimeHealth / EventBus
//! ```

use super::builtin::{self, TaskLauncher, TaskServices};
use super::error::{DispatchError, RuntimeError};
use super::outcome::DispatchOutcome;
use crate::capability::{CapabilityInfo, CapabilityRegistry};
use crate::command::{Command, CommandKind, Payload};
use crate::config::QuartetConfig;
use crate::engine::{
    AutomationEngine, DebugPromptBuilder, DebuggingEngine, HeuristicDebugger, InsightEngine,
    ProcessMonitor, SharedAgent, SimulatedAutomationEngine, SimulatedProcessMonitor,
    SummaryInsightEngine, DEFAULT_MAX_LOG_CHARS,
};
use crate::mode::ModeManager;
use crate::router::ModeAwareRouter;
use crate::session::{
    HealthSnapshot, RuntimeHealth, SessionState, SessionTranscript, TranscriptKind,
};
use crate::task::{TaskRecord, TaskRunner, DEFAULT_MAX_WORKERS};
use quartet_event::{Event, EventBus};
use quartet_types::{ErrorCode, Mode, ModeFlags, SubscriptionId, TaskId};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

const SOURCE: &str = "workspace_runtime";

/// Serializable overview for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStatus {
    pub mode: Mode,
    pub flags: ModeFlags,
    pub health: HealthSnapshot,
    pub active_tasks: BTreeMap<TaskId, Value>,
    pub capabilities: Vec<CapabilityInfo>,
    pub transcript_entries: usize,
}

/// Builder for [`WorkspaceRuntime`].
///
/// Engines left unset get the in-process implementations.
#[must_use]
pub struct WorkspaceRuntimeBuilder {
    initial_mode: Mode,
    max_workers: usize,
    max_log_chars: usize,
    simulate_crash: bool,
    bus: Option<Arc<EventBus>>,
    monitor: Option<Arc<dyn ProcessMonitor>>,
    debugger: Option<Arc<dyn DebuggingEngine>>,
    automation: Option<Arc<dyn AutomationEngine>>,
    insight: Option<Arc<dyn InsightEngine>>,
}

impl Default for WorkspaceRuntimeBuilder {
    fn default() -> Self {
        Self {
            initial_mode: Mode::Smart,
            max_workers: DEFAULT_MAX_WORKERS,
            max_log_chars: DEFAULT_MAX_LOG_CHARS,
            simulate_crash: false,
            bus: None,
            monitor: None,
            debugger: None,
            automation: None,
            insight: None,
        }
    }
}

impl WorkspaceRuntimeBuilder {
    /// Takes mode, pool size, prompt size and crash simulation from `config`.
    pub fn with_config(mut self, config: &QuartetConfig) -> Self {
        self.initial_mode = config.runtime.initial_mode;
        self.max_workers = config.runtime.max_workers;
        self.max_log_chars = config.debugging.max_log_chars;
        self.simulate_crash = config.process.simulate_crash;
        self
    }

    pub fn initial_mode(mut self, mode: Mode) -> Self {
        self.initial_mode = mode;
        self
    }

    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn simulate_crash(mut self, simulate: bool) -> Self {
        self.simulate_crash = simulate;
        self
    }

    /// Shares an existing bus instead of creating one.
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_process_monitor(mut self, monitor: Arc<dyn ProcessMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_debugger(mut self, debugger: Arc<dyn DebuggingEngine>) -> Self {
        self.debugger = Some(debugger);
        self
    }

    pub fn with_automation_engine(mut self, engine: Arc<dyn AutomationEngine>) -> Self {
        self.automation = Some(engine);
        self
    }

    pub fn with_insight_engine(mut self, engine: Arc<dyn InsightEngine>) -> Self {
        self.insight = Some(engine);
        self
    }

    /// Assembles the runtime, registers built-ins and installs listeners.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if the task pool cannot start.
    pub fn build(self) -> Result<WorkspaceRuntime, RuntimeError> {
        let bus = self.bus.unwrap_or_else(|| Arc::new(EventBus::new()));
        let transcript = Arc::new(SessionTranscript::new());
        let state = Arc::new(SessionState::new(self.initial_mode));
        let modes = Arc::new(ModeManager::new(
            self.initial_mode,
            Arc::clone(&bus),
            Arc::clone(&transcript),
        ));
        let health = Arc::new(RuntimeHealth::new(Arc::clone(&bus), Arc::clone(&transcript)));
        let capabilities = Arc::new(CapabilityRegistry::new());
        let tasks = Arc::new(TaskRunner::new(Arc::clone(&bus), self.max_workers)?);

        let simulate_crash = self.simulate_crash;
        let monitor = self.monitor.unwrap_or_else(|| {
            Arc::new(SimulatedProcessMonitor::new(Arc::clone(&bus), simulate_crash))
        });
        let debugger = self.debugger.unwrap_or_else(|| {
            Arc::new(HeuristicDebugger::new(
                Arc::clone(&bus),
                DebugPromptBuilder::new(self.max_log_chars),
            ))
        });
        let automation = self.automation.unwrap_or_else(|| {
            Arc::new(SimulatedAutomationEngine::new(
                Arc::clone(&bus),
                Arc::clone(&monitor),
                Arc::clone(&debugger),
            ))
        });
        let insight = self
            .insight
            .unwrap_or_else(|| Arc::new(SummaryInsightEngine::new(Arc::clone(&bus))));

        builtin::register_tasks(
            &tasks,
            &TaskServices {
                bus: Arc::clone(&bus),
                modes: Arc::clone(&modes),
                state: Arc::clone(&state),
                monitor,
                automation,
                debugger,
                insight,
            },
        );
        builtin::register_capabilities(
            &capabilities,
            &TaskLauncher {
                tasks: Arc::clone(&tasks),
                state: Arc::clone(&state),
                transcript: Arc::clone(&transcript),
            },
            &modes,
            &state,
        );

        let router = ModeAwareRouter::new(
            Arc::clone(&capabilities),
            Arc::clone(&bus),
            Arc::clone(&modes),
        );

        let mut runtime = WorkspaceRuntime {
            bus,
            modes,
            capabilities,
            router,
            tasks,
            state,
            transcript,
            health,
            listeners: Vec::new(),
        };
        runtime.install_listeners()?;

        let crash_detail = if simulate_crash {
            "crash simulation on"
        } else {
            "crash simulation off"
        };
        for (engine, detail) in [
            ("process_monitor", crash_detail),
            ("debugging", "heuristics with optional agent escalation"),
            ("automation", "sequential workflow runner"),
            ("insight", "summary analysis"),
        ] {
            runtime.health.set_engine_health(engine, "ready", detail);
        }
        info!(
            mode = %runtime.modes.mode(),
            max_workers = runtime.tasks.max_workers(),
            capabilities = runtime.capabilities.len(),
            "Workspace runtime initialized"
        );
        Ok(runtime)
    }
}

/// Central orchestrator.
pub struct WorkspaceRuntime {
    bus: Arc<EventBus>,
    modes: Arc<ModeManager>,
    capabilities: Arc<CapabilityRegistry>,
    router: ModeAwareRouter,
    tasks: Arc<TaskRunner>,
    state: Arc<SessionState>,
    transcript: Arc<SessionTranscript>,
    health: Arc<RuntimeHealth>,
    listeners: Vec<SubscriptionId>,
}

impl WorkspaceRuntime {
    pub fn builder() -> WorkspaceRuntimeBuilder {
        WorkspaceRuntimeBuilder::default()
    }

    fn install_listeners(&mut self) -> Result<(), RuntimeError> {
        let health: Weak<RuntimeHealth> = Arc::downgrade(&self.health);
        self.listeners.push(self.bus.subscribe("task.error", move |event| {
            if let Some(health) = health.upgrade() {
                health.record_task_failure(
                    event.str_field("task_id").unwrap_or_default(),
                    event.str_field("name").unwrap_or_default(),
                    event.str_field("error").unwrap_or_default(),
                );
            }
            Ok(())
        })?);

        for pattern in ["task.finished", "task.error"] {
            let state: Weak<SessionState> = Arc::downgrade(&self.state);
            self.listeners.push(self.bus.subscribe(pattern, move |event: &Event| {
                let id = event.str_field("task_id").and_then(|s| TaskId::from_str(s).ok());
                if let (Some(state), Some(id)) = (state.upgrade(), id) {
                    state.clear_active_task(id);
                }
                Ok(())
            })?);
        }
        Ok(())
    }

    /// Routes one command and records the outcome.
    ///
    /// Every call appends one `command` transcript entry and ends with a
    /// `result` or `error` entry.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the chosen capability fails. The
    /// failure is also counted in health and stored as the last error.
    pub fn dispatch(
        &self,
        command: &Command,
        agent: Option<&SharedAgent>,
        payload: Payload,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.health.tick_loop();
        debug!(
            kind = %command.kind,
            mode = ?command.mode,
            raw = %command.raw,
            "Dispatching command"
        );
        let summary = json!({"kind": command.kind, "raw": command.raw});
        self.bus.publish("command.dispatch", summary.clone(), SOURCE);
        self.transcript
            .append(TranscriptKind::Command, "Command dispatched", summary);
        self.state.set_mode(self.modes.mode());

        match command.kind {
            CommandKind::Noop => {
                self.transcript.append(
                    TranscriptKind::Result,
                    "No-op command",
                    json!({"status": "noop"}),
                );
                return Ok(DispatchOutcome::Noop);
            }
            CommandKind::Unknown => {
                self.bus
                    .publish("command.unknown", json!({"raw": command.raw}), SOURCE);
                self.transcript.append(
                    TranscriptKind::Error,
                    "Unknown command",
                    json!({"raw": command.raw}),
                );
                return Ok(DispatchOutcome::Unknown {
                    raw: command.raw.clone(),
                });
            }
            _ => {}
        }

        match self.router.route(command, &payload, agent) {
            Ok(outcome) => {
                let value = outcome.to_value();
                let keys: Vec<&String> = value
                    .as_object()
                    .map(|m| m.keys().collect())
                    .unwrap_or_default();
                self.transcript.append(
                    TranscriptKind::Result,
                    "Capability result",
                    json!({"status": outcome.status(), "keys": keys}),
                );
                Ok(DispatchOutcome::Routed(outcome))
            }
            Err(e) => {
                let message = e.source.to_string();
                warn!(capability = %e.capability, error = %message, "Capability failed");
                self.health.record_capability_error(&e.capability, &message);
                self.state.set_last_error(json!({
                    "message": message,
                    "capability": e.capability,
                    "code": e.source.code(),
                }));
                Err(DispatchError::Capability(e))
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> RuntimeStatus {
        RuntimeStatus {
            mode: self.modes.mode(),
            flags: self.modes.flags(),
            health: self.health.snapshot(),
            active_tasks: self.state.active_tasks(),
            capabilities: self.capabilities.list().iter().map(|c| c.info()).collect(),
            transcript_entries: self.transcript.len(),
        }
    }

    /// Blocks until every submitted task has settled. False on timeout.
    #[must_use]
    pub fn wait_for_tasks(&self, timeout: Duration) -> bool {
        self.tasks.wait_idle(timeout)
    }

    #[must_use]
    pub fn task_records(&self) -> Vec<TaskRecord> {
        self.tasks.records()
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    #[must_use]
    pub fn modes(&self) -> &Arc<ModeManager> {
        &self.modes
    }

    #[must_use]
    pub fn capabilities(&self) -> &Arc<CapabilityRegistry> {
        &self.capabilities
    }

    #[must_use]
    pub fn tasks(&self) -> &Arc<TaskRunner> {
        &self.tasks
    }

    #[must_use]
    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    #[must_use]
    pub fn transcript(&self) -> &Arc<SessionTranscript> {
        &self.transcript
    }

    #[must_use]
    pub fn health(&self) -> &Arc<RuntimeHealth> {
        &self.health
    }
}

impl Drop for WorkspaceRuntime {
    fn drop(&mut self) {
        for id in self.listeners.drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}
