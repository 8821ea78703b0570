//! Mutable per-runtime session record.
//!
//! [`SessionState`] is a single record guarded by one lock. Setters are
//! individually atomic; they do not enforce consistency between fields.

use parking_lot::RwLock;
use quartet_types::{Mode, TaskId};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Point-in-time copy of the session record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionData {
    /// Mode last synced from the mode manager.
    pub current_mode: Mode,
    /// Tasks started by capabilities and not yet finished.
    pub active_tasks: BTreeMap<TaskId, Value>,
    /// Most recent failure detail.
    pub last_error: Option<Value>,
    /// Most recently collected process log lines.
    pub last_logs: Vec<Value>,
    /// Most recently polled process state.
    pub last_process_state: Option<Value>,
    /// Debugging results, oldest first.
    pub debugging_history: Vec<Value>,
    /// Insight results, oldest first.
    pub insight_results: Vec<Value>,
}

/// Shared session record.
#[derive(Debug, Default)]
pub struct SessionState {
    data: RwLock<SessionData>,
}

impl SessionState {
    /// Creates a session starting in `mode`.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            data: RwLock::new(SessionData {
                current_mode: mode,
                ..SessionData::default()
            }),
        }
    }

    pub fn set_mode(&self, mode: Mode) {
        self.data.write().current_mode = mode;
        debug!(mode = %mode, "Session mode synced");
    }

    pub fn set_active_task(&self, task_id: TaskId, info: Value) {
        self.data.write().active_tasks.insert(task_id, info);
        debug!(task_id = %task_id, "Active task recorded");
    }

    /// Removes a task from the active set. Returns false if it was not active.
    pub fn clear_active_task(&self, task_id: TaskId) -> bool {
        let removed = self.data.write().active_tasks.remove(&task_id).is_some();
        debug!(task_id = %task_id, removed, "Active task cleared");
        removed
    }

    pub fn set_last_error(&self, error: Value) {
        debug!(error = %error, "Last error updated");
        self.data.write().last_error = Some(error);
    }

    pub fn set_last_logs(&self, logs: Vec<Value>) {
        debug!(count = logs.len(), "Last logs updated");
        self.data.write().last_logs = logs;
    }

    pub fn set_last_process_state(&self, state: Value) {
        debug!("Last process state updated");
        self.data.write().last_process_state = Some(state);
    }

    pub fn append_debugging_result(&self, result: Value) {
        let mut data = self.data.write();
        data.debugging_history.push(result);
        debug!(count = data.debugging_history.len(), "Debugging result appended");
    }

    pub fn append_insight_result(&self, result: Value) {
        let mut data = self.data.write();
        data.insight_results.push(result);
        debug!(count = data.insight_results.len(), "Insight result appended");
    }

    #[must_use]
    pub fn current_mode(&self) -> Mode {
        self.data.read().current_mode
    }

    #[must_use]
    pub fn last_error(&self) -> Option<Value> {
        self.data.read().last_error.clone()
    }

    #[must_use]
    pub fn active_tasks(&self) -> BTreeMap<TaskId, Value> {
        self.data.read().active_tasks.clone()
    }

    #[must_use]
    pub fn debugging_history(&self) -> Vec<Value> {
        self.data.read().debugging_history.clone()
    }

    #[must_use]
    pub fn insight_results(&self) -> Vec<Value> {
        self.data.read().insight_results.clone()
    }

    /// Copies the whole record.
    #[must_use]
    pub fn snapshot(&self) -> SessionData {
        self.data.read().clone()
    }
}
