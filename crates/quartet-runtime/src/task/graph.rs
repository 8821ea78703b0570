//! Declarative task graph.
//!
//! Nodes describe tasks and their dependencies. Nothing here executes a
//! graph; retry and timeout policies are carried as data only.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutPolicy {
    pub timeout_ms: Option<u64>,
}

/// One node of a [`TaskGraph`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskNode {
    /// Unique node name.
    pub name: String,
    /// Registered task the node would run.
    pub task_name: String,
    pub depends_on: Vec<String>,
    pub condition: Option<String>,
    pub retry_policy: RetryPolicy,
    pub timeout_policy: TimeoutPolicy,
    pub metadata: Value,
}

impl TaskNode {
    #[must_use]
    pub fn new(name: impl Into<String>, task_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_name: task_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }
}

/// Nodes keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph {
    nodes: BTreeMap<String, TaskNode>,
}

impl TaskGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node`, replacing any node with the same name.
    pub fn add_node(&mut self, node: TaskNode) {
        self.nodes.insert(node.name.clone(), node);
    }

    #[must_use]
    pub fn get_node(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.get(name)
    }

    /// Nodes sorted by name.
    #[must_use]
    pub fn list_nodes(&self) -> Vec<&TaskNode> {
        self.nodes.values().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// One message per dependency on a node that does not exist, in
    /// node-name order. Empty means the graph is well formed.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        self.nodes
            .values()
            .flat_map(|node| {
                node.depends_on
                    .iter()
                    .filter(|dep| !self.nodes.contains_key(dep.as_str()))
                    .map(move |dep| format!("node '{}' depends on missing '{}'", node.name, dep))
            })
            .collect()
    }
}
