//! Session record, transcript and health counters.

mod health;
mod state;
mod transcript;

pub use health::{HealthSnapshot, RuntimeHealth};
pub use state::{SessionData, SessionState};
pub use transcript::{SessionTranscript, TranscriptEntry, TranscriptKind};
