//! EventBus - synchronous in-process publish/subscribe.
//!
//! # Delivery Model
//!
//! ```text
//! publish("task.started")
//!     │
//!     ├─ lock ──► snapshot matching subscriptions ──► detach `once` ones ── unlock
//!     │
//!     ├─► handler #1 (registration order)
//!     ├─► handler #2      Err / panic ──► warn!, keep going
//!     └─► handler #3
//!     │
//!     ▼
//! returns Event
//! ```
//!
//! - Handlers run on the publishing thread before `publish` returns.
//! - The subscription lock is released before any handler runs, so
//!   handlers may publish, subscribe and unsubscribe re-entrantly.
//! - A `once` subscription is detached while the lock is held, so it fires
//!   exactly once even when two threads publish a matching event at the
//!   same moment. It stays detached when its single invocation fails.
//! - Ordering is guaranteed only within one publish call.
//!
//! # Pattern Syntax
//!
//! Patterns are shell globs matched against the whole event name.
//! Dots carry no special meaning:
//!
//! | Pattern | Matches |
//! |---------|---------|
//! | `task.*` | `task.started`, `task.cancel_requested` |
//! | `*.error` | `task.error` |
//! | `task.?tart` | `task.start` |
//! | `health.[ct]*` | `health.task_failure`, `health.capability_error` |
//! | `*` | everything |
//!
//! Runs of `*` are collapsed to a single `*`, so `task.**` behaves like
//! `task.*`.

use crate::error::{EventError, HandlerError};
use crate::event::Event;
use parking_lot::Mutex;
use quartet_types::SubscriptionId;
use serde_json::Value;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result returned by event handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Shared event handler.
pub type EventHandler = Arc<dyn Fn(&Event) -> HandlerResult + Send + Sync>;

/// A compiled shell-glob pattern over event names.
#[derive(Clone, PartialEq, Eq)]
pub struct EventPattern {
    source: String,
    compiled: glob::Pattern,
}

impl EventPattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidPattern`] for malformed globs such as
    /// an unclosed `[`.
    pub fn new(pattern: &str) -> Result<Self, EventError> {
        let compiled =
            glob::Pattern::new(&collapse_stars(pattern)).map_err(|e| EventError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            source: pattern.to_string(),
            compiled,
        })
    }

    /// Returns true if `name` matches the whole pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.compiled.matches(name)
    }

    /// Returns the pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// `glob` reserves `**` for path segments; event names have none.
fn collapse_stars(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && out.ends_with('*') {
            continue;
        }
        out.push(c);
    }
    out
}

impl fmt::Debug for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventPattern").field(&self.source).finish()
    }
}

/// A registered handler together with its pattern.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    pattern: EventPattern,
    handler: EventHandler,
    once: bool,
}

impl Subscription {
    /// Subscription id.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Pattern this subscription listens on.
    #[must_use]
    pub fn pattern(&self) -> &EventPattern {
        &self.pattern
    }

    /// True if the subscription detaches after its first match.
    #[must_use]
    pub fn is_once(&self) -> bool {
        self.once
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pattern", &self.pattern)
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}

/// Synchronous publish/subscribe hub.
///
/// # Example
///
/// ```
/// use quartet_event::EventBus;
/// use serde_json::json;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let bus = EventBus::new();
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&seen);
/// bus.subscribe("task.*", move |_event| {
///     counter.fetch_add(1, Ordering::SeqCst);
///     Ok(())
/// })
/// .unwrap();
///
/// bus.publish("task.started", json!({"name": "demo"}), "example");
/// bus.publish("mode.changed", json!({}), "example");
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct EventBus {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Registers `handler` for every event whose name matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidPattern`] if `pattern` is not a valid glob.
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> Result<SubscriptionId, EventError>
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(pattern, Arc::new(handler), false)
    }

    /// Registers `handler` for the first matching event only.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidPattern`] if `pattern` is not a valid glob.
    pub fn subscribe_once<F>(&self, pattern: &str, handler: F) -> Result<SubscriptionId, EventError>
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(pattern, Arc::new(handler), true)
    }

    fn add(
        &self,
        pattern: &str,
        handler: EventHandler,
        once: bool,
    ) -> Result<SubscriptionId, EventError> {
        let pattern = EventPattern::new(pattern)?;
        let id = SubscriptionId::new();
        debug!(subscription = %id, pattern = pattern.as_str(), once, "Subscribed");
        self.subscriptions.lock().push(Subscription {
            id,
            pattern,
            handler,
            once,
        });
        Ok(id)
    }

    /// Removes a subscription. Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.lock();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        before != subs.len()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Publishes an event and delivers it to every matching subscriber.
    ///
    /// Handler failures and panics are logged and swallowed.
    pub fn publish(
        &self,
        name: impl Into<String>,
        payload: Value,
        source: impl Into<String>,
    ) -> Event {
        let event = Event::new(name, payload, source);
        let targets = self.take_targets(&event.name);

        for sub in &targets {
            match catch_unwind(AssertUnwindSafe(|| (sub.handler)(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    event = %event.name,
                    pattern = sub.pattern.as_str(),
                    error = %e,
                    "Event handler failed"
                ),
                Err(panic) => warn!(
                    event = %event.name,
                    pattern = sub.pattern.as_str(),
                    panic = panic_message(panic.as_ref()),
                    "Event handler panicked"
                ),
            }
        }

        event
    }

    /// Snapshots matching subscriptions and detaches `once` entries.
    fn take_targets(&self, name: &str) -> Vec<Subscription> {
        let mut subs = self.subscriptions.lock();
        let targets: Vec<Subscription> = subs
            .iter()
            .filter(|s| s.pattern.matches(name))
            .cloned()
            .collect();
        if targets.iter().any(|s| s.once) {
            subs.retain(|s| !(s.once && s.pattern.matches(name)));
        }
        targets
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}
