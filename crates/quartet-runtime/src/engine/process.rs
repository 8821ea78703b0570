//! Process monitoring interface and its simulated implementation.
//!
//! No OS process is ever spawned. [`SimulatedProcessMonitor`] hands out
//! handles, reports every process as running and, when configured to, reports
//! a crash with two synthetic log lines.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use quartet_event::EventBus;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const SOURCE: &str = "process_monitor";

/// What to launch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessSpec {
    pub name: String,
    pub argv: Vec<String>,
    pub cwd: Option<String>,
    pub env: BTreeMap<String, String>,
}

/// A launched (simulated) process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessHandle {
    pub pid: String,
    pub spec: ProcessSpec,
    pub started_at: DateTime<Utc>,
}

/// Result of polling a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessState {
    pub pid: String,
    pub running: bool,
    pub last_heartbeat: DateTime<Utc>,
}

/// One captured output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub ts: DateTime<Utc>,
    pub source: String,
    pub message: String,
}

/// Structured description of a detected crash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrashReport {
    pub process: ProcessHandle,
    pub detected_at: DateTime<Utc>,
    pub error_type: String,
    pub exit_code: Option<i32>,
    pub message: String,
    pub logs: Vec<LogLine>,
    pub metadata: Value,
}

impl CrashReport {
    /// Flat error map as stored in session state and fed to debugging.
    #[must_use]
    pub fn to_error_data(&self) -> Value {
        json!({
            "process": {
                "pid": self.process.pid,
                "name": self.process.spec.name,
                "argv": self.process.spec.argv,
                "cwd": self.process.spec.cwd,
            },
            "detected_at": self.detected_at,
            "error_type": self.error_type,
            "exit_code": self.exit_code,
            "message": self.message,
            "logs": self.logs,
            "metadata": self.metadata,
        })
    }
}

/// Narrow interface to a process supervisor.
pub trait ProcessMonitor: Send + Sync {
    fn launch_process(&self, spec: ProcessSpec) -> ProcessHandle;
    fn poll(&self, handle: &ProcessHandle) -> ProcessState;
    /// Returns a report if the process crashed.
    fn detect_crash(&self, handle: &ProcessHandle) -> Option<CrashReport>;
    fn collect_logs(&self, handle: &ProcessHandle) -> Vec<LogLine>;
}

/// In-memory stand-in for a real supervisor.
pub struct SimulatedProcessMonitor {
    bus: Arc<EventBus>,
    simulate_crash: bool,
    logs: Mutex<HashMap<String, Vec<LogLine>>>,
}

impl SimulatedProcessMonitor {
    #[must_use]
    pub fn new(bus: Arc<EventBus>, simulate_crash: bool) -> Self {
        Self {
            bus,
            simulate_crash,
            logs: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn simulates_crash(&self) -> bool {
        self.simulate_crash
    }
}

impl ProcessMonitor for SimulatedProcessMonitor {
    fn launch_process(&self, spec: ProcessSpec) -> ProcessHandle {
        let handle = ProcessHandle {
            pid: Uuid::new_v4().to_string(),
            spec,
            started_at: Utc::now(),
        };
        self.logs.lock().insert(handle.pid.clone(), Vec::new());
        debug!(pid = %handle.pid, name = %handle.spec.name, "Process launch requested");
        self.bus.publish(
            "process.launch_requested",
            json!({
                "pid": handle.pid,
                "name": handle.spec.name,
                "argv": handle.spec.argv,
                "cwd": handle.spec.cwd,
            }),
            SOURCE,
        );
        handle
    }

    fn poll(&self, handle: &ProcessHandle) -> ProcessState {
        let state = ProcessState {
            pid: handle.pid.clone(),
            running: true,
            last_heartbeat: Utc::now(),
        };
        self.bus.publish(
            "process.polled",
            serde_json::to_value(&state).unwrap_or(Value::Null),
            SOURCE,
        );
        state
    }

    fn detect_crash(&self, handle: &ProcessHandle) -> Option<CrashReport> {
        let name = &handle.spec.name;
        self.bus.publish(
            "process.crash_check",
            json!({"pid": handle.pid, "name": name, "simulate": self.simulate_crash}),
            SOURCE,
        );
        if !self.simulate_crash {
            return None;
        }

        let logs = vec![
            LogLine {
                ts: Utc::now(),
                source: "stdout".into(),
                message: format!("{name}: starting"),
            },
            LogLine {
                ts: Utc::now(),
                source: "stderr".into(),
                message: format!("{name}: simulated crash"),
            },
        ];
        self.logs
            .lock()
            .entry(handle.pid.clone())
            .or_default()
            .extend(logs.iter().cloned());

        let report = CrashReport {
            process: handle.clone(),
            detected_at: Utc::now(),
            error_type: "SimulatedCrash".into(),
            exit_code: Some(1),
            message: "Process crash simulated.".into(),
            logs,
            metadata: json!({"simulated": true}),
        };
        warn!(pid = %handle.pid, name = %name, "Crash detected");
        self.bus.publish(
            "process.crash_detected",
            json!({
                "pid": handle.pid,
                "name": name,
                "error_type": report.error_type,
                "exit_code": report.exit_code,
            }),
            SOURCE,
        );
        Some(report)
    }

    fn collect_logs(&self, handle: &ProcessHandle) -> Vec<LogLine> {
        let lines = self.logs.lock().get(&handle.pid).cloned().unwrap_or_default();
        self.bus.publish(
            "process.logs_collected",
            json!({"pid": handle.pid, "count": lines.len()}),
            SOURCE,
        );
        lines
    }
}
