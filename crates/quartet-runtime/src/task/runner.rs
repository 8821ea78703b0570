//! Named task execution on a bounded worker pool.
//!
//! # Lifecycle
//!
//! ```text
//! run_task ──► Running ──► Ok         task.finished + task.finish
//!                 │
//!                 ├──────► Error      task.error + task.errored
//!                 │
//!                 └──────► Cancelled  task.finished + task.finish
//! ```
//!
//! Bodies run on the blocking pool of a runner-owned tokio runtime whose
//! size is the configured worker count. A watcher on the same runtime
//! awaits each body, updates the record and publishes the completion
//! events, so the submitting thread never blocks.

use super::error::{TaskError, TaskRunnerError};
use crate::command::Payload;
use crate::engine::SharedAgent;
use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex, RwLock};
use quartet_event::EventBus;
use quartet_types::TaskId;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio::task::{AbortHandle, JoinError};
use tracing::{debug, info, warn};

const SOURCE: &str = "task_runner";

/// Default number of concurrently running task bodies.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Input handed to a task body.
#[derive(Clone, Default)]
pub struct TaskArgs {
    pub params: Payload,
    pub agent: Option<SharedAgent>,
}

impl TaskArgs {
    #[must_use]
    pub fn new(params: Payload) -> Self {
        Self {
            params,
            agent: None,
        }
    }

    #[must_use]
    pub fn with_agent(mut self, agent: Option<SharedAgent>) -> Self {
        self.agent = agent;
        self
    }
}

impl fmt::Debug for TaskArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskArgs")
            .field("params", &self.params)
            .field("agent", &self.agent.is_some())
            .finish()
    }
}

/// A registered task body.
pub type TaskFn = Arc<dyn Fn(TaskArgs) -> Result<Value, TaskError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Ok,
    Error,
    Cancelled,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub cancel_requested: bool,
    pub metadata: Value,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

struct TaskEntry {
    record: TaskRecord,
    cancel: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
    /// Completion events have been delivered.
    settled: bool,
}

struct Shared {
    bus: Arc<EventBus>,
    entries: Mutex<HashMap<TaskId, TaskEntry>>,
    settled: Condvar,
}

impl Shared {
    fn finish(&self, id: TaskId, outcome: Result<Result<Value, TaskError>, JoinError>) {
        let (status, result, error) = match outcome {
            Ok(Ok(value)) => (TaskStatus::Ok, Some(value), None),
            Ok(Err(TaskError::Cancelled)) => (TaskStatus::Cancelled, None, None),
            Ok(Err(e)) => (TaskStatus::Error, None, Some(e.to_string())),
            Err(e) if e.is_cancelled() => (TaskStatus::Cancelled, None, None),
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                (TaskStatus::Error, None, Some(TaskError::Panicked(message).to_string()))
            }
            Err(e) => (TaskStatus::Error, None, Some(e.to_string())),
        };

        let name = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&id) else {
                return;
            };
            entry.record.status = status;
            entry.record.result = result;
            entry.record.error = error.clone();
            entry.record.finished_at = Some(Utc::now());
            entry.abort = None;
            entry.record.name.clone()
        };

        let task_id = id.to_string();
        match &error {
            Some(message) => {
                warn!(task_id = %task_id, task = %name, error = %message, "Task failed");
                let payload = json!({
                    "task_id": task_id,
                    "name": name,
                    "status": status,
                    "error": message,
                });
                self.bus.publish("task.error", payload.clone(), SOURCE);
                self.bus.publish("task.errored", payload, SOURCE);
            }
            None => {
                debug!(task_id = %task_id, task = %name, %status, "Task finished");
                let payload = json!({"task_id": task_id, "name": name, "status": status});
                self.bus.publish("task.finished", payload.clone(), SOURCE);
                self.bus.publish("task.finish", payload, SOURCE);
            }
        }

        if let Some(entry) = self.entries.lock().get_mut(&id) {
            entry.settled = true;
        }
        self.settled.notify_all();
    }
}

/// Registry of named task bodies plus the pool that runs them.
pub struct TaskRunner {
    tasks: RwLock<HashMap<String, TaskFn>>,
    shared: Arc<Shared>,
    runtime: Option<Runtime>,
    max_workers: usize,
}

impl TaskRunner {
    /// Starts a runner with `max_workers` pool threads (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunnerError::PoolStartup`] if the pool threads cannot
    /// be created.
    pub fn new(bus: Arc<EventBus>, max_workers: usize) -> Result<Self, TaskRunnerError> {
        let max_workers = max_workers.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_workers)
            .thread_name("quartet-task")
            .enable_time()
            .build()
            .map_err(TaskRunnerError::PoolStartup)?;
        info!(max_workers, "Task runner started");
        Ok(Self {
            tasks: RwLock::new(HashMap::new()),
            shared: Arc::new(Shared {
                bus,
                entries: Mutex::new(HashMap::new()),
                settled: Condvar::new(),
            }),
            runtime: Some(runtime),
            max_workers,
        })
    }

    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Registers `body` under `name`, replacing any previous body.
    pub fn register_task<F>(&self, name: &str, body: F)
    where
        F: Fn(TaskArgs) -> Result<Value, TaskError> + Send + Sync + 'static,
    {
        self.tasks.write().insert(name.to_string(), Arc::new(body));
        debug!(task = name, "Task registered");
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.tasks.read().contains_key(name)
    }

    /// Registered task names, sorted.
    #[must_use]
    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tasks.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Submits `name` for execution and returns its id immediately.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRunnerError::NotRegistered`] for unknown names. No
    /// record is created and no event is published in that case.
    pub fn run_task(&self, name: &str, args: TaskArgs) -> Result<TaskId, TaskRunnerError> {
        let body = self
            .tasks
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| TaskRunnerError::NotRegistered {
                name: name.to_string(),
            })?;
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(TaskRunnerError::PoolStartup(std::io::Error::other(
                "task pool shut down",
            )));
        };

        let id = TaskId::new();
        let cancel = Arc::new(AtomicBool::new(false));
        let param_keys: Vec<&String> = args.params.keys().collect();
        let omitted: serde_json::Map<String, Value> = args
            .params
            .keys()
            .map(|k| (k.clone(), Value::String("<omitted>".into())))
            .collect();

        self.shared.entries.lock().insert(
            id,
            TaskEntry {
                record: TaskRecord {
                    id,
                    name: name.to_string(),
                    status: TaskStatus::Running,
                    result: None,
                    error: None,
                    cancel_requested: false,
                    metadata: json!({"param_keys": param_keys}),
                    submitted_at: Utc::now(),
                    finished_at: None,
                },
                cancel: Arc::clone(&cancel),
                abort: None,
                settled: false,
            },
        );

        let task_id = id.to_string();
        info!(task_id = %task_id, task = name, "Task started");
        self.shared.bus.publish(
            "task.started",
            json!({"task_id": task_id, "name": name, "params": omitted}),
            SOURCE,
        );
        self.shared.bus.publish(
            "task.start",
            json!({"task_id": task_id, "name": name}),
            SOURCE,
        );

        let join = runtime.spawn_blocking(move || {
            if cancel.load(Ordering::SeqCst) {
                return Err(TaskError::Cancelled);
            }
            body(args)
        });
        let abort = join.abort_handle();
        if let Some(entry) = self.shared.entries.lock().get_mut(&id) {
            if !entry.record.status.is_terminal() {
                entry.abort = Some(abort);
            }
        }

        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move {
            let outcome = join.await;
            shared.finish(id, outcome);
        });

        Ok(id)
    }

    /// Requests cancellation.
    ///
    /// A body that has not started yet will not run. A running body is not
    /// interrupted. Returns false if the task is unknown or already done.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        let accepted = {
            let mut entries = self.shared.entries.lock();
            match entries.get_mut(&id) {
                Some(entry) if !entry.record.status.is_terminal() => {
                    entry.cancel.store(true, Ordering::SeqCst);
                    entry.record.cancel_requested = true;
                    if let Some(abort) = entry.abort.take() {
                        abort.abort();
                    }
                    Some(entry.record.name.clone())
                }
                _ => None,
            }
        };
        let Some(name) = accepted else {
            return false;
        };
        self.shared.bus.publish(
            "task.cancel_requested",
            json!({"task_id": id.to_string(), "name": name}),
            SOURCE,
        );
        true
    }

    #[must_use]
    pub fn record(&self, id: TaskId) -> Option<TaskRecord> {
        self.shared.entries.lock().get(&id).map(|e| e.record.clone())
    }

    /// All records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<TaskRecord> {
        let mut records: Vec<_> = self
            .shared
            .entries
            .lock()
            .values()
            .map(|e| e.record.clone())
            .collect();
        records.sort_by_key(|r| r.submitted_at);
        records
    }

    /// Blocks until the task settles or `timeout` elapses, then returns its
    /// record. A record still `Running` means the wait timed out.
    #[must_use]
    pub fn wait_for(&self, id: TaskId, timeout: Duration) -> Option<TaskRecord> {
        let deadline = Instant::now() + timeout;
        let mut entries = self.shared.entries.lock();
        loop {
            let entry = entries.get(&id)?;
            if entry.settled {
                return Some(entry.record.clone());
            }
            if self
                .shared
                .settled
                .wait_until(&mut entries, deadline)
                .timed_out()
            {
                return entries.get(&id).map(|e| e.record.clone());
            }
        }
    }

    /// Blocks until every submitted task has settled. Returns false on
    /// timeout.
    #[must_use]
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut entries = self.shared.entries.lock();
        loop {
            if entries.values().all(|e| e.settled) {
                return true;
            }
            if self
                .shared
                .settled
                .wait_until(&mut entries, deadline)
                .timed_out()
            {
                return entries.values().all(|e| e.settled);
            }
        }
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("tasks", &self.task_names())
            .field("max_workers", &self.max_workers)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(s) => *s,
        Err(panic) => panic
            .downcast_ref::<&'static str>()
            .map_or_else(|| "<non-string panic>".to_string(), |s| (*s).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quartet_event::Board;
    use std::sync::mpsc;

    const WAIT: Duration = Duration::from_secs(5);

    fn runner(max_workers: usize) -> (TaskRunner, Board) {
        let bus = Arc::new(EventBus::new());
        let board = Board::attach(&bus, "task.*").expect("valid pattern");
        (TaskRunner::new(bus, max_workers).expect("pool"), board)
    }

    fn params(value: Value) -> TaskArgs {
        match value {
            Value::Object(map) => TaskArgs::new(map),
            _ => TaskArgs::default(),
        }
    }

    #[test]
    fn unregistered_task_is_rejected_without_events() {
        let (runner, board) = runner(2);
        let err = runner
            .run_task("ghost_task", TaskArgs::default())
            .expect_err("not registered");
        assert!(matches!(err, TaskRunnerError::NotRegistered { ref name } if name == "ghost_task"));
        assert!(board.is_empty());
        assert!(runner.records().is_empty());
    }

    #[test]
    fn successful_task_records_result_and_events() {
        let (runner, board) = runner(2);
        runner.register_task("double", |args| {
            let n = args.params.get("n").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(n * 2))
        });

        let id = runner.run_task("double", params(json!({"n": 21}))).expect("submitted");
        let record = runner.wait_for(id, WAIT).expect("known task");
        assert_eq!(record.status, TaskStatus::Ok);
        assert_eq!(record.result, Some(json!(42)));
        assert!(record.finished_at.is_some());
        assert_eq!(record.metadata["param_keys"], json!(["n"]));

        assert_eq!(
            board.names(),
            ["task.started", "task.start", "task.finished", "task.finish"]
        );
        let started = &board.all()[0];
        assert_eq!(started.payload["params"], json!({"n": "<omitted>"}));
        assert_eq!(started.payload["task_id"], json!(id.to_string()));
    }

    #[test]
    fn failing_and_panicking_bodies_are_captured() {
        let (runner, board) = runner(2);
        runner.register_task("fail", |_| Err(TaskError::Failed("disk full".into())));
        runner.register_task("panic", |_| panic!("kaboom"));

        let failed = runner.run_task("fail", TaskArgs::default()).expect("submitted");
        let panicked = runner.run_task("panic", TaskArgs::default()).expect("submitted");

        let failed = runner.wait_for(failed, WAIT).expect("record");
        assert_eq!(failed.status, TaskStatus::Error);
        assert_eq!(failed.error.as_deref(), Some("disk full"));

        let panicked = runner.wait_for(panicked, WAIT).expect("record");
        assert_eq!(panicked.status, TaskStatus::Error);
        assert!(panicked.error.as_deref().is_some_and(|e| e.contains("kaboom")));

        assert_eq!(board.count("task.error"), 2);
        assert_eq!(board.count("task.errored"), 2);
        assert_eq!(board.count("task.finished"), 0);
    }

    #[test]
    fn cancel_before_start_skips_the_body() {
        let (runner, board) = runner(1);
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        runner.register_task("block", move |_| {
            let _ = release_rx.lock().recv_timeout(WAIT);
            Ok(Value::Null)
        });
        runner.register_task("quick", |_| Ok(json!("ran")));

        let blocker = runner.run_task("block", TaskArgs::default()).expect("submitted");
        let queued = runner.run_task("quick", TaskArgs::default()).expect("submitted");
        assert!(runner.cancel_task(queued));
        release_tx.send(()).expect("blocker waiting");

        let record = runner.wait_for(queued, WAIT).expect("record");
        assert_eq!(record.status, TaskStatus::Cancelled);
        assert!(record.cancel_requested);
        assert!(record.result.is_none());
        assert_eq!(runner.wait_for(blocker, WAIT).map(|r| r.status), Some(TaskStatus::Ok));
        let requested: Vec<_> = board
            .all()
            .into_iter()
            .filter(|e| e.name == "task.cancel_requested")
            .collect();
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].payload["task_id"], json!(queued.to_string()));
        assert_eq!(requested[0].payload["name"], json!("quick"));
        assert!(!runner.cancel_task(queued), "already settled");
    }

    #[test]
    fn reregistration_replaces_the_body() {
        let (runner, _board) = runner(1);
        runner.register_task("x", |_| Ok(json!("first")));
        runner.register_task("x", |_| Ok(json!("second")));
        assert_eq!(runner.task_names(), ["x"]);

        let id = runner.run_task("x", TaskArgs::default()).expect("submitted");
        assert_eq!(
            runner.wait_for(id, WAIT).and_then(|r| r.result),
            Some(json!("second"))
        );
    }

    #[test]
    fn wait_times_out_on_a_running_task() {
        let (runner, _board) = runner(1);
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        runner.register_task("block", move |_| {
            let _ = release_rx.lock().recv_timeout(WAIT);
            Ok(Value::Null)
        });

        let id = runner.run_task("block", TaskArgs::default()).expect("submitted");
        let record = runner.wait_for(id, Duration::from_millis(20)).expect("record");
        assert_eq!(record.status, TaskStatus::Running);
        assert!(!runner.wait_idle(Duration::from_millis(5)));

        release_tx.send(()).expect("blocker waiting");
        assert!(runner.wait_idle(WAIT));
        assert!(runner.wait_for(TaskId::new(), WAIT).is_none());
    }
}
