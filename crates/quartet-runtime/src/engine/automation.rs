//! Workflow execution.
//!
//! [`SimulatedAutomationEngine`] walks the workflow's tasks in order. A task
//! whose action is `launch_process` goes through the [`ProcessMonitor`]; a
//! detected crash runs one debugging pass and fails the workflow. Any other
//! action completes immediately.

use super::agent::SharedAgent;
use super::debugging::{DebugResult, DebuggingEngine};
use super::process::{ProcessMonitor, ProcessSpec};
use quartet_event::EventBus;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

const SOURCE: &str = "automation_engine";

/// Action name that launches a monitored process.
pub const LAUNCH_PROCESS_ACTION: &str = "launch_process";

/// One workflow step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationTask {
    pub name: String,
    pub action: String,
    pub parameters: Map<String, Value>,
}

/// An ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSpec {
    pub name: String,
    pub tasks: Vec<AutomationTask>,
}

impl Default for WorkflowSpec {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl WorkflowSpec {
    /// Empty workflow used when a request carries none.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            name: "placeholder".into(),
            tasks: Vec::new(),
        }
    }

    /// Reads a workflow object, or the placeholder when `value` is absent or
    /// malformed.
    #[must_use]
    pub fn from_value_or_placeholder(value: Option<&Value>) -> Self {
        value
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_else(Self::placeholder)
    }
}

/// Final workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Completed,
    Failed,
}

impl WorkflowStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomationResult {
    pub status: WorkflowStatus,
    pub workflow: String,
    pub completed_tasks: Vec<String>,
    pub failed_task: Option<String>,
    pub debug_result: Option<DebugResult>,
}

/// Runs workflows.
pub trait AutomationEngine: Send + Sync {
    fn run_workflow(&self, spec: &WorkflowSpec, agent: Option<&SharedAgent>) -> AutomationResult;
}

pub struct SimulatedAutomationEngine {
    bus: Arc<EventBus>,
    monitor: Arc<dyn ProcessMonitor>,
    debugger: Arc<dyn DebuggingEngine>,
}

impl SimulatedAutomationEngine {
    #[must_use]
    pub fn new(
        bus: Arc<EventBus>,
        monitor: Arc<dyn ProcessMonitor>,
        debugger: Arc<dyn DebuggingEngine>,
    ) -> Self {
        Self {
            bus,
            monitor,
            debugger,
        }
    }

    fn process_spec(task: &AutomationTask) -> ProcessSpec {
        let name = task
            .parameters
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&task.name)
            .to_string();
        let argv = task
            .parameters
            .get("argv")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let cwd = task
            .parameters
            .get("cwd")
            .and_then(Value::as_str)
            .map(str::to_string);
        ProcessSpec {
            name,
            argv,
            cwd,
            ..ProcessSpec::default()
        }
    }
}

impl AutomationEngine for SimulatedAutomationEngine {
    fn run_workflow(&self, spec: &WorkflowSpec, agent: Option<&SharedAgent>) -> AutomationResult {
        info!(workflow = %spec.name, tasks = spec.tasks.len(), "Workflow started");
        self.bus.publish(
            "automation.workflow_started",
            json!({"workflow": spec.name, "tasks": spec.tasks.len()}),
            SOURCE,
        );

        let mut completed = Vec::with_capacity(spec.tasks.len());
        for task in &spec.tasks {
            self.bus.publish(
                "automation.task_started",
                json!({"workflow": spec.name, "task": task.name, "action": task.action}),
                SOURCE,
            );

            if task.action == LAUNCH_PROCESS_ACTION {
                let handle = self.monitor.launch_process(Self::process_spec(task));
                self.monitor.poll(&handle);
                if let Some(crash) = self.monitor.detect_crash(&handle) {
                    warn!(workflow = %spec.name, task = %task.name, "Workflow task crashed");
                    let debug_result = self.debugger.debug_error(
                        &crash.to_error_data(),
                        agent,
                        &json!({"workflow": spec.name, "task": task.name}),
                    );
                    self.bus.publish(
                        "automation.workflow_failed",
                        json!({
                            "workflow": spec.name,
                            "task": task.name,
                            "reason": "process_crash",
                        }),
                        SOURCE,
                    );
                    return AutomationResult {
                        status: WorkflowStatus::Failed,
                        workflow: spec.name.clone(),
                        completed_tasks: completed,
                        failed_task: Some(task.name.clone()),
                        debug_result: Some(debug_result),
                    };
                }
            }

            self.bus.publish(
                "automation.task_finished",
                json!({"workflow": spec.name, "task": task.name}),
                SOURCE,
            );
            completed.push(task.name.clone());
        }

        self.bus.publish(
            "automation.workflow_finished",
            json!({"workflow": spec.name, "completed": completed.len()}),
            SOURCE,
        );
        AutomationResult {
            status: WorkflowStatus::Completed,
            workflow: spec.name.clone(),
            completed_tasks: completed,
            failed_task: None,
            debug_result: None,
        }
    }
}
