//! Queue-driven command loop.
//!
//! ```text
//! LoopHandle::enqueue_command ──► mpsc (unbounded, FIFO) ──► WorkspaceLoop
//!        (any thread)                                            │
//! LoopHandle::stop ──► watch<bool> ──────────────────────────────┘
//!                                                   CommandSurface::submit
//! ```
//!
//! Producers never block. The consumer processes one command at a time;
//! a stop request is honored between commands, never in the middle of one.

use super::error::LoopError;
use super::runtime::WorkspaceRuntime;
use super::surface::{CommandInput, CommandSurface};
use crate::command::Payload;
use crate::engine::SharedAgent;
use crate::session::TranscriptKind;
use quartet_event::EventBus;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

const SOURCE: &str = "workspace_loop";

struct QueuedCommand {
    input: CommandInput,
    payload: Payload,
}

/// Cloneable producer side of a [`WorkspaceLoop`].
#[derive(Clone)]
pub struct LoopHandle {
    tx: mpsc::UnboundedSender<QueuedCommand>,
    shutdown: Arc<watch::Sender<bool>>,
    bus: Arc<EventBus>,
}

impl LoopHandle {
    /// Queues a command. Callable from any thread, sync or async.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::Closed`] once the loop has been dropped.
    pub fn enqueue_command(
        &self,
        input: impl Into<CommandInput>,
        payload: Payload,
    ) -> Result<(), LoopError> {
        let input = input.into();
        let kind = input.kind_name();
        self.tx
            .send(QueuedCommand { input, payload })
            .map_err(|_| LoopError::Closed)?;
        self.bus.publish("loop.enqueued", json!({"type": kind}), SOURCE);
        Ok(())
    }

    /// Asks the loop to stop after the command in flight, if any.
    pub fn stop(&self) {
        let was_stopped = self.shutdown.send_replace(true);
        if !was_stopped {
            info!("Workspace loop stop requested");
            self.bus.publish("loop.stopped", json!({}), SOURCE);
        }
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Single consumer that feeds queued commands to a [`CommandSurface`].
pub struct WorkspaceLoop {
    runtime: Arc<WorkspaceRuntime>,
    surface: CommandSurface,
    rx: mpsc::UnboundedReceiver<QueuedCommand>,
    handle: LoopHandle,
    shutdown_rx: watch::Receiver<bool>,
    agent: Option<SharedAgent>,
}

impl WorkspaceLoop {
    #[must_use]
    pub fn new(runtime: Arc<WorkspaceRuntime>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = LoopHandle {
            tx,
            shutdown: Arc::new(shutdown_tx),
            bus: Arc::clone(runtime.bus()),
        };
        Self {
            surface: CommandSurface::new(Arc::clone(&runtime)),
            runtime,
            rx,
            handle,
            shutdown_rx,
            agent: None,
        }
    }

    /// Passes `agent` to every submitted command.
    #[must_use]
    pub fn with_agent(mut self, agent: SharedAgent) -> Self {
        self.agent = Some(agent);
        self
    }

    #[must_use]
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn runtime(&self) -> &Arc<WorkspaceRuntime> {
        &self.runtime
    }

    /// See [`LoopHandle::enqueue_command`].
    ///
    /// # Errors
    ///
    /// Never fails while `self` is alive; kept fallible to match the handle.
    pub fn enqueue_command(
        &self,
        input: impl Into<CommandInput>,
        payload: Payload,
    ) -> Result<(), LoopError> {
        self.handle.enqueue_command(input, payload)
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Processes the next queued command, waiting up to `timeout` for one.
    pub async fn process_next(&mut self, timeout: Duration) -> Option<Value> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(queued)) => Some(self.process(queued)),
            Ok(None) | Err(_) => None,
        }
    }

    /// Processes commands until [`stop`](Self::stop) is called.
    pub async fn run_forever(&mut self) {
        self.runtime
            .bus()
            .publish("loop.started", json!({}), SOURCE);
        info!("Workspace loop started");

        loop {
            if *self.shutdown_rx.borrow_and_update() {
                break;
            }
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                queued = self.rx.recv() => {
                    match queued {
                        Some(queued) => {
                            self.process(queued);
                        }
                        None => break,
                    }
                }
            }
        }

        info!("Workspace loop stopped");
    }

    fn process(&self, queued: QueuedCommand) -> Value {
        let runtime = &self.runtime;
        let kind = queued.input.kind_name();
        runtime.health().tick_loop();
        runtime
            .bus()
            .publish("loop.dequeued", json!({"type": kind}), SOURCE);
        runtime.transcript().append(
            TranscriptKind::Command,
            "Command dequeued",
            json!({"type": kind}),
        );

        let behavior = runtime.modes().behavior();
        runtime.transcript().append(
            TranscriptKind::Mode,
            "Mode behavior evaluated",
            json!({"mode": runtime.modes().mode(), "flags": behavior.flags()}),
        );

        let result = self
            .surface
            .submit(queued.input, queued.payload, self.agent.as_ref());
        let status = result
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("ok")
            .to_string();

        if status == "error" {
            let message = result.get("error").cloned().unwrap_or(Value::Null);
            runtime.transcript().append(
                TranscriptKind::Error,
                "Command error",
                json!({"error": message}),
            );
            runtime.state().set_last_error(json!({"message": message}));
        } else {
            let keys: Vec<&String> = result
                .as_object()
                .map(|m| m.keys().collect())
                .unwrap_or_default();
            runtime.transcript().append(
                TranscriptKind::Result,
                "Command result",
                json!({"status": status, "keys": keys}),
            );
        }

        debug!(kind, status = %status, "Command processed");
        runtime
            .bus()
            .publish("loop.processed", json!({"status": status}), SOURCE);
        result
    }
}
