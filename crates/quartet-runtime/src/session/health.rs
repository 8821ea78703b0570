//! Runtime health tracking.
//!
//! | Mutator | Event | Transcript |
//! |---------|-------|------------|
//! | [`tick_loop`](RuntimeHealth::tick_loop) | - | - |
//! | [`set_engine_health`](RuntimeHealth::set_engine_health) | `health.engine` | `health` |
//! | [`record_task_failure`](RuntimeHealth::record_task_failure) | `health.task_failure` | `error` |
//! | [`record_capability_error`](RuntimeHealth::record_capability_error) | `health.capability_error` | `error` |
//!
//! Failure counters only grow.

use super::transcript::{SessionTranscript, TranscriptKind};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use quartet_event::EventBus;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

const SOURCE: &str = "runtime_health";

/// Copy of the health counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    /// Engine name to status.
    pub engine_status: BTreeMap<String, String>,
    /// Number of failed tasks observed.
    pub task_failures: u64,
    /// Number of failed capability executions.
    pub capability_errors: u64,
    /// Last dispatch or loop heartbeat.
    pub last_loop_tick: Option<DateTime<Utc>>,
}

/// Health tracker shared by the runtime and its listeners.
#[derive(Debug)]
pub struct RuntimeHealth {
    data: Mutex<HealthSnapshot>,
    bus: Arc<EventBus>,
    transcript: Arc<SessionTranscript>,
}

impl RuntimeHealth {
    #[must_use]
    pub fn new(bus: Arc<EventBus>, transcript: Arc<SessionTranscript>) -> Self {
        Self {
            data: Mutex::new(HealthSnapshot::default()),
            bus,
            transcript,
        }
    }

    /// Records a heartbeat.
    pub fn tick_loop(&self) {
        self.data.lock().last_loop_tick = Some(Utc::now());
    }

    pub fn set_engine_health(&self, engine: &str, status: &str, detail: &str) {
        self.data
            .lock()
            .engine_status
            .insert(engine.to_string(), status.to_string());
        debug!(engine, status, detail, "Engine health updated");

        let data = json!({"engine": engine, "status": status, "detail": detail});
        self.bus.publish("health.engine", data.clone(), SOURCE);
        self.transcript.append(
            TranscriptKind::Health,
            format!("Engine {engine}={status}"),
            data,
        );
    }

    pub fn record_task_failure(&self, task_id: &str, name: &str, error: &str) {
        let count = {
            let mut data = self.data.lock();
            data.task_failures += 1;
            data.task_failures
        };
        warn!(task_id, name, error, count, "Task failure recorded");

        self.bus.publish(
            "health.task_failure",
            json!({"task_id": task_id, "name": name, "error": error, "count": count}),
            SOURCE,
        );
        self.transcript.append(
            TranscriptKind::Error,
            "Task failure",
            json!({"task_id": task_id, "name": name, "error": error}),
        );
    }

    pub fn record_capability_error(&self, capability: &str, error: &str) {
        let count = {
            let mut data = self.data.lock();
            data.capability_errors += 1;
            data.capability_errors
        };
        warn!(capability, error, count, "Capability error recorded");

        self.bus.publish(
            "health.capability_error",
            json!({"capability": capability, "error": error, "count": count}),
            SOURCE,
        );
        self.transcript.append(
            TranscriptKind::Error,
            "Capability error",
            json!({"capability": capability, "error": error}),
        );
    }

    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        self.data.lock().clone()
    }
}
