//! Engine collaborators behind the built-in capabilities.
//!
//! Each engine is a trait with one in-process implementation. The process
//! monitor and automation engine simulate their work; the debugger applies
//! keyword heuristics unless an [`Agent`] is available.

mod agent;
mod automation;
mod debugging;
mod insight;
mod process;
mod prompt;

pub use agent::{agent_fn, Agent, AgentError, AgentPrompt, SharedAgent};
pub use automation::{
    AutomationEngine, AutomationResult, AutomationTask, SimulatedAutomationEngine, WorkflowSpec,
    WorkflowStatus, LAUNCH_PROCESS_ACTION,
};
pub use debugging::{heuristic_diagnosis, DebugResult, DebugStatus, DebuggingEngine, HeuristicDebugger};
pub use insight::{InsightEngine, InsightResult, SummaryInsightEngine};
pub use process::{
    CrashReport, LogLine, ProcessHandle, ProcessMonitor, ProcessSpec, ProcessState,
    SimulatedProcessMonitor,
};
pub use prompt::{DebugPromptBuilder, DEFAULT_MAX_LOG_CHARS};
