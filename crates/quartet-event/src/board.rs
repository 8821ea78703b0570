//! Board - rolling buffer of recently published events.
//!
//! The bus never retains events. A [`Board`] subscribes to a pattern and
//! keeps the last N matching events for retrospective queries (the CLI's
//! `:events` command, tests asserting on emitted events).
//!
//! ```text
//! EventBus ──publish──► Board handler ──► VecDeque<Event> (evicts oldest)
//!                                             │
//!                                             ▼ recent(n) / names()
//! ```

use crate::bus::EventBus;
use crate::error::EventError;
use crate::event::Event;
use parking_lot::Mutex;
use quartet_types::SubscriptionId;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default maximum entries kept by a board.
pub const DEFAULT_BOARD_CAPACITY: usize = 1000;

/// Rolling event log attached to a bus.
#[derive(Debug, Clone)]
pub struct Board {
    entries: Arc<Mutex<VecDeque<Event>>>,
    max_entries: usize,
    subscription: SubscriptionId,
}

impl Board {
    /// Attaches a board with [`DEFAULT_BOARD_CAPACITY`] to `bus`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidPattern`] if `pattern` is not a valid glob.
    pub fn attach(bus: &EventBus, pattern: &str) -> Result<Self, EventError> {
        Self::attach_with_capacity(bus, pattern, DEFAULT_BOARD_CAPACITY)
    }

    /// Attaches a board keeping at most `max_entries` events.
    ///
    /// A capacity of 0 is treated as 1.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidPattern`] if `pattern` is not a valid glob.
    pub fn attach_with_capacity(
        bus: &EventBus,
        pattern: &str,
        max_entries: usize,
    ) -> Result<Self, EventError> {
        let max_entries = max_entries.max(1);
        let entries = Arc::new(Mutex::new(VecDeque::with_capacity(max_entries.min(64))));
        let sink = Arc::clone(&entries);
        let subscription = bus.subscribe(pattern, move |event| {
            let mut log = sink.lock();
            if log.len() >= max_entries {
                log.pop_front();
            }
            log.push_back(event.clone());
            Ok(())
        })?;
        Ok(Self {
            entries,
            max_entries,
            subscription,
        })
    }

    /// Subscription backing this board.
    #[must_use]
    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// Maximum retained events.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Returns the most recent `n` events, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<Event> {
        let log = self.entries.lock();
        let skip = log.len().saturating_sub(n);
        log.iter().skip(skip).cloned().collect()
    }

    /// Returns every retained event, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<Event> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Names of every retained event, oldest first.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.name.clone()).collect()
    }

    /// Number of retained events named exactly `name`.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.entries.lock().iter().filter(|e| e.name == name).count()
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drops every retained event.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
