//! Built-in capabilities and the tasks behind them.
//!
//! | Capability | Task |
//! |------------|------|
//! | `mode.set` | none, runs inline |
//! | `process.monitor` | `monitor_process` |
//! | `debug.debug_last_error` | `debug_last_error` |
//! | `automation.run_workflow` | `run_workflow` |
//! | `insight.analyze` | `insight_analyze` |
//!
//! Task-backed capabilities return as soon as the task is submitted:
//! `{status: ok, task_id, task}`.

use crate::capability::{CapabilityError, CapabilityHandler, CapabilityRegistry};
use crate::command::{Command, Payload};
use crate::engine::{
    AutomationEngine, DebuggingEngine, InsightEngine, ProcessMonitor, ProcessSpec, SharedAgent,
    WorkflowSpec,
};
use crate::mode::ModeManager;
use crate::session::{SessionState, SessionTranscript, TranscriptKind};
use crate::task::{TaskArgs, TaskError, TaskRunner};
use quartet_event::EventBus;
use quartet_types::Mode;
use serde_json::{json, Map, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

const SOURCE: &str = "workspace_runtime";

pub const MONITOR_PROCESS_TASK: &str = "monitor_process";
pub const RUN_WORKFLOW_TASK: &str = "run_workflow";
pub const DEBUG_LAST_ERROR_TASK: &str = "debug_last_error";
pub const INSIGHT_ANALYZE_TASK: &str = "insight_analyze";

/// Handles the task bodies need. Holds no reference to the task runner.
#[derive(Clone)]
pub(crate) struct TaskServices {
    pub bus: Arc<EventBus>,
    pub modes: Arc<ModeManager>,
    pub state: Arc<SessionState>,
    pub monitor: Arc<dyn ProcessMonitor>,
    pub automation: Arc<dyn AutomationEngine>,
    pub debugger: Arc<dyn DebuggingEngine>,
    pub insight: Arc<dyn InsightEngine>,
}

pub(crate) fn register_tasks(runner: &TaskRunner, services: &TaskServices) {
    let s = services.clone();
    runner.register_task(MONITOR_PROCESS_TASK, move |args| monitor_process(&s, args));
    let s = services.clone();
    runner.register_task(RUN_WORKFLOW_TASK, move |args| run_workflow(&s, args));
    let s = services.clone();
    runner.register_task(DEBUG_LAST_ERROR_TASK, move |args| debug_last_error(&s, args));
    let s = services.clone();
    runner.register_task(INSIGHT_ANALYZE_TASK, move |args| insight_analyze(&s, args));
}

pub(crate) fn register_capabilities(
    registry: &CapabilityRegistry,
    launcher: &TaskLauncher,
    modes: &Arc<ModeManager>,
    state: &Arc<SessionState>,
) {
    registry.register(
        "mode.set",
        ModeSetCapability {
            modes: Arc::clone(modes),
            state: Arc::clone(state),
        },
        "Switch the active mode",
    );
    registry.register(
        "process.monitor",
        ProcessMonitorCapability(launcher.clone()),
        "Launch and watch a process",
    );
    registry.register(
        "debug.debug_last_error",
        DebugLastErrorCapability(launcher.clone()),
        "Diagnose the last recorded error",
    );
    registry.register(
        "automation.run_workflow",
        RunWorkflowCapability(launcher.clone()),
        "Run a workflow",
    );
    registry.register(
        "insight.analyze",
        InsightAnalyzeCapability(launcher.clone()),
        "Summarize text",
    );
}

/// Submits a task and records it as active.
#[derive(Clone)]
pub(crate) struct TaskLauncher {
    pub tasks: Arc<TaskRunner>,
    pub state: Arc<SessionState>,
    pub transcript: Arc<SessionTranscript>,
}

impl TaskLauncher {
    fn launch(&self, task: &str, args: TaskArgs, note: Value) -> Result<Value, CapabilityError> {
        let id = self.tasks.run_task(task, args)?;
        self.state.set_active_task(id, json!({"name": task}));

        let mut data = Map::new();
        data.insert("task_id".into(), json!(id.to_string()));
        if let Value::Object(extra) = note {
            data.extend(extra);
        }
        self.transcript
            .append(TranscriptKind::Task, format!("Started {task}"), Value::Object(data));

        // A fast task may settle before it was marked active.
        if self
            .tasks
            .record(id)
            .is_some_and(|r| r.status.is_terminal())
        {
            self.state.clear_active_task(id);
        }
        Ok(json!({"status": "ok", "task_id": id.to_string(), "task": task}))
    }
}

struct ModeSetCapability {
    modes: Arc<ModeManager>,
    state: Arc<SessionState>,
}

impl CapabilityHandler for ModeSetCapability {
    fn execute(
        &self,
        payload: &Payload,
        _agent: Option<&SharedAgent>,
        command: &Command,
    ) -> Result<Value, CapabilityError> {
        let target = match (command.mode, payload.get("mode")) {
            (Some(mode), _) => mode,
            (None, None | Some(Value::Null)) => {
                return Ok(json!({"status": "error", "error": "missing target mode"}));
            }
            (None, Some(Value::String(name))) => Mode::from_str(name)?,
            (None, Some(other)) => {
                return Err(CapabilityError::invalid_payload(
                    "mode.set",
                    format!("mode must be a string, got {other}"),
                ));
            }
        };
        self.modes.set_mode(target, "capability: mode.set");
        self.state.set_mode(self.modes.mode());
        Ok(json!({"status": "ok", "mode": target}))
    }
}

struct ProcessMonitorCapability(TaskLauncher);

impl CapabilityHandler for ProcessMonitorCapability {
    fn execute(
        &self,
        payload: &Payload,
        _agent: Option<&SharedAgent>,
        _command: &Command,
    ) -> Result<Value, CapabilityError> {
        let name = payload
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .unwrap_or("placeholder");
        let argv: Vec<String> = match payload.get("argv") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        CapabilityError::invalid_payload("process.monitor", "argv must hold strings")
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(CapabilityError::invalid_payload(
                    "process.monitor",
                    "argv must be a list",
                ))
            }
        };

        let params = object(json!({"name": name, "argv": argv}));
        self.0
            .launch(MONITOR_PROCESS_TASK, TaskArgs::new(params), json!({"name": name}))
    }
}

struct DebugLastErrorCapability(TaskLauncher);

impl CapabilityHandler for DebugLastErrorCapability {
    fn execute(
        &self,
        _payload: &Payload,
        agent: Option<&SharedAgent>,
        _command: &Command,
    ) -> Result<Value, CapabilityError> {
        let args = TaskArgs::default().with_agent(agent.cloned());
        self.0.launch(DEBUG_LAST_ERROR_TASK, args, Value::Null)
    }
}

struct RunWorkflowCapability(TaskLauncher);

impl CapabilityHandler for RunWorkflowCapability {
    fn execute(
        &self,
        payload: &Payload,
        agent: Option<&SharedAgent>,
        _command: &Command,
    ) -> Result<Value, CapabilityError> {
        let workflow = WorkflowSpec::from_value_or_placeholder(payload.get("workflow"));
        let params = object(json!({"workflow": workflow}));
        let args = TaskArgs::new(params).with_agent(agent.cloned());
        self.0
            .launch(RUN_WORKFLOW_TASK, args, json!({"workflow": workflow.name}))
    }
}

struct InsightAnalyzeCapability(TaskLauncher);

impl CapabilityHandler for InsightAnalyzeCapability {
    fn execute(
        &self,
        payload: &Payload,
        _agent: Option<&SharedAgent>,
        command: &Command,
    ) -> Result<Value, CapabilityError> {
        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(&command.raw);
        let params = object(json!({"text": text}));
        self.0.launch(
            INSIGHT_ANALYZE_TASK,
            TaskArgs::new(params),
            json!({"chars": text.chars().count()}),
        )
    }
}

fn object(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

fn monitor_process(s: &TaskServices, args: TaskArgs) -> Result<Value, TaskError> {
    let spec: ProcessSpec = serde_json::from_value(Value::Object(args.params))
        .map_err(|e| TaskError::invalid_params(e.to_string()))?;
    debug!(name = %spec.name, "Task: monitor_process");

    let handle = s.monitor.launch_process(spec);
    let state = serde_json::to_value(s.monitor.poll(&handle)).unwrap_or(Value::Null);
    s.state.set_last_process_state(state.clone());

    let logs = s.monitor.collect_logs(&handle);
    s.state.set_last_logs(
        logs.iter()
            .filter_map(|line| serde_json::to_value(line).ok())
            .collect(),
    );

    if let Some(crash) = s.monitor.detect_crash(&handle) {
        let error = crash.to_error_data();
        s.state.set_last_error(error.clone());
        s.bus.publish("process.crash", error.clone(), SOURCE);
        return Ok(json!({"status": "crashed", "error": error}));
    }

    s.bus.publish("process.state", state.clone(), SOURCE);
    Ok(json!({
        "status": "ok",
        "process": {"pid": handle.pid, "name": handle.spec.name},
        "state": state,
    }))
}

fn run_workflow(s: &TaskServices, args: TaskArgs) -> Result<Value, TaskError> {
    let workflow = match args.params.get("workflow") {
        None | Some(Value::Null) => WorkflowSpec::placeholder(),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| TaskError::invalid_params(format!("workflow: {e}")))?,
    };
    debug!(workflow = %workflow.name, "Task: run_workflow");

    let result = s.automation.run_workflow(&workflow, args.agent.as_ref());
    s.bus.publish(
        "automation.result",
        json!({"status": result.status, "workflow": result.workflow}),
        SOURCE,
    );

    let mut out = json!({
        "status": result.status,
        "workflow": result.workflow,
        "completed": result.completed_tasks,
        "failed_task": result.failed_task,
    });
    if let (Some(debug), Some(map)) = (&result.debug_result, out.as_object_mut()) {
        map.insert("debug_result".into(), debug.to_value());
    }
    Ok(out)
}

fn debug_last_error(s: &TaskServices, args: TaskArgs) -> Result<Value, TaskError> {
    let Some(last_error) = s.state.last_error() else {
        return Ok(json!({"status": "no_error"}));
    };
    let mode = s.state.current_mode();
    let agent = args
        .agent
        .filter(|_| s.modes.behavior().should_generate_agent_prompt(true));
    debug!(mode = %mode, has_agent = agent.is_some(), "Task: debug_last_error");

    let result = s
        .debugger
        .debug_error(&last_error, agent.as_ref(), &json!({"mode": mode}))
        .to_value();
    s.state.append_debugging_result(result.clone());
    s.bus.publish("debug.result", result.clone(), SOURCE);
    Ok(result)
}

fn insight_analyze(s: &TaskServices, args: TaskArgs) -> Result<Value, TaskError> {
    let text = args
        .params
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    debug!(chars = text.chars().count(), "Task: insight_analyze");

    let result = s.insight.analyze(Some(text)).to_value();
    s.state.append_insight_result(result.clone());
    s.bus.publish("insight.result", result.clone(), SOURCE);
    Ok(result)
}
