//! Name to handler map.

use super::error::CapabilityError;
use super::taxonomy::CapabilityCategory;
use crate::command::{Command, Payload};
use crate::engine::SharedAgent;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Executable behavior behind a capability name.
///
/// One implementation per capability. The router invokes it with the
/// request payload, the optional escalation agent and the command that
/// resolved to it.
pub trait CapabilityHandler: Send + Sync {
    /// Runs the capability.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError`] when the capability cannot run. Soft
    /// failures the caller should see as data are returned as `Ok` maps
    /// with a `status` field instead.
    fn execute(
        &self,
        payload: &Payload,
        agent: Option<&SharedAgent>,
        command: &Command,
    ) -> Result<Value, CapabilityError>;
}

struct FnHandler<F>(F);

impl<F> CapabilityHandler for FnHandler<F>
where
    F: Fn(&Payload, Option<&SharedAgent>, &Command) -> Result<Value, CapabilityError>
        + Send
        + Sync,
{
    fn execute(
        &self,
        payload: &Payload,
        agent: Option<&SharedAgent>,
        command: &Command,
    ) -> Result<Value, CapabilityError> {
        (self.0)(payload, agent, command)
    }
}

/// A registered capability.
#[derive(Clone)]
pub struct Capability {
    name: String,
    handler: Arc<dyn CapabilityHandler>,
    description: String,
}

impl Capability {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn category(&self) -> CapabilityCategory {
        CapabilityCategory::classify(&self.name)
    }

    /// Runs the handler.
    ///
    /// # Errors
    ///
    /// Propagates the handler's [`CapabilityError`].
    pub fn execute(
        &self,
        payload: &Payload,
        agent: Option<&SharedAgent>,
        command: &Command,
    ) -> Result<Value, CapabilityError> {
        self.handler.execute(payload, agent, command)
    }

    /// Serializable summary for reporting.
    #[must_use]
    pub fn info(&self) -> CapabilityInfo {
        CapabilityInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category(),
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Reporting view of a [`Capability`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityInfo {
    pub name: String,
    pub description: String,
    pub category: CapabilityCategory,
}

/// Registry of capabilities keyed by unique name.
///
/// Registering an existing name replaces it.
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: RwLock<BTreeMap<String, Capability>>,
}

impl CapabilityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            capabilities: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers `handler` under `name`, replacing any previous entry.
    pub fn register<H>(&self, name: &str, handler: H, description: &str)
    where
        H: CapabilityHandler + 'static,
    {
        self.insert(name, Arc::new(handler), description);
    }

    /// Registers a closure under `name`, replacing any previous entry.
    pub fn register_fn<F>(&self, name: &str, handler: F, description: &str)
    where
        F: Fn(&Payload, Option<&SharedAgent>, &Command) -> Result<Value, CapabilityError>
            + Send
            + Sync
            + 'static,
    {
        self.insert(name, Arc::new(FnHandler(handler)), description);
    }

    fn insert(&self, name: &str, handler: Arc<dyn CapabilityHandler>, description: &str) {
        let replaced = self
            .capabilities
            .write()
            .insert(
                name.to_string(),
                Capability {
                    name: name.to_string(),
                    handler,
                    description: description.to_string(),
                },
            )
            .is_some();
        debug!(capability = name, replaced, "Capability registered");
    }

    /// Removes a capability. Returns false if it was not registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.capabilities.write().remove(name).is_some()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Capability> {
        self.capabilities.read().get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.read().contains_key(name)
    }

    /// Every capability, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<Capability> {
        self.capabilities.read().values().cloned().collect()
    }

    /// Names grouped by category, in [`CapabilityCategory::ALL`] order.
    #[must_use]
    pub fn by_category(&self) -> Vec<(CapabilityCategory, Vec<String>)> {
        let caps = self.capabilities.read();
        CapabilityCategory::ALL
            .iter()
            .map(|cat| {
                let names = caps
                    .values()
                    .filter(|c| c.category() == *cat)
                    .map(|c| c.name.clone())
                    .collect();
                (*cat, names)
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.capabilities.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.capabilities.read().is_empty()
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("names", &self.capabilities.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
