//! External agent interface used for debugging escalation.

use quartet_types::ErrorCode;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Structured prompt handed to an [`Agent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentPrompt {
    /// System message.
    pub system: String,
    /// User message.
    pub user: String,
    /// Inputs the prompt was built from.
    pub metadata: Value,
}

/// Agent call failure.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The agent could not be reached.
    #[error("agent unavailable: {0}")]
    Unavailable(String),
    /// The agent answered with an error.
    #[error("agent failed: {0}")]
    Failed(String),
}

impl ErrorCode for AgentError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "AGENT_UNAVAILABLE",
            Self::Failed(_) => "AGENT_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Text generator that debugging can escalate to.
pub trait Agent: Send + Sync {
    /// Produces a diagnosis for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when no answer is available. Callers fall back
    /// to local heuristics.
    fn generate(&self, prompt: &AgentPrompt) -> Result<String, AgentError>;
}

/// Shared agent handle passed through dispatch.
pub type SharedAgent = Arc<dyn Agent>;

struct FnAgent<F>(F);

impl<F> Agent for FnAgent<F>
where
    F: Fn(&AgentPrompt) -> Result<String, AgentError> + Send + Sync,
{
    fn generate(&self, prompt: &AgentPrompt) -> Result<String, AgentError> {
        (self.0)(prompt)
    }
}

/// Wraps a closure as a [`SharedAgent`].
///
/// ```
/// use quartet_runtime::engine::{agent_fn, AgentPrompt};
/// use serde_json::Value;
///
/// let agent = agent_fn(|prompt| Ok(format!("{} chars", prompt.user.len())));
/// let prompt = AgentPrompt { system: String::new(), user: "abc".into(), metadata: Value::Null };
/// assert_eq!(agent.generate(&prompt).unwrap(), "3 chars");
/// ```
pub fn agent_fn<F>(f: F) -> SharedAgent
where
    F: Fn(&AgentPrompt) -> Result<String, AgentError> + Send + Sync + 'static,
{
    Arc::new(FnAgent(f))
}
