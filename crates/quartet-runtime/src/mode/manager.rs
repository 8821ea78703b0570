//! Holder of the single active [`Mode`].

use super::rules::ModeBehavior;
use crate::session::{SessionTranscript, TranscriptKind};
use parking_lot::RwLock;
use quartet_event::EventBus;
use quartet_types::{Mode, ModeFlags};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

struct ModeState {
    current: Mode,
    overrides: HashMap<Mode, ModeFlags>,
}

/// Active mode plus per-mode flag overrides.
///
/// A change is applied under the write lock; the `mode.changed` event and
/// the transcript entry are emitted after the lock is released, exactly
/// once per real change.
pub struct ModeManager {
    state: RwLock<ModeState>,
    bus: Arc<EventBus>,
    transcript: Arc<SessionTranscript>,
}

impl ModeManager {
    #[must_use]
    pub fn new(initial: Mode, bus: Arc<EventBus>, transcript: Arc<SessionTranscript>) -> Self {
        Self {
            state: RwLock::new(ModeState {
                current: initial,
                overrides: HashMap::new(),
            }),
            bus,
            transcript,
        }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.state.read().current
    }

    #[must_use]
    pub fn is_mode(&self, mode: Mode) -> bool {
        self.mode() == mode
    }

    /// Switches to `mode` and returns the mode now active.
    ///
    /// Requesting the active mode is a no-op: nothing is emitted.
    pub fn set_mode(&self, mode: Mode, reason: &str) -> Mode {
        let previous = {
            let mut state = self.state.write();
            if state.current == mode {
                None
            } else {
                Some(std::mem::replace(&mut state.current, mode))
            }
        };

        let Some(from) = previous else {
            debug!(mode = %mode, reason, "Mode unchanged");
            return mode;
        };

        info!(from = %from, to = %mode, reason, "Mode changed");
        self.bus.publish(
            "mode.changed",
            json!({"from": from, "to": mode, "reason": reason}),
            "mode_manager",
        );
        self.transcript.append(
            TranscriptKind::Mode,
            format!("Mode changed: {from} -> {mode}"),
            json!({"from": from, "to": mode, "reason": reason}),
        );
        mode
    }

    /// Flags of the active mode.
    #[must_use]
    pub fn flags(&self) -> ModeFlags {
        let state = self.state.read();
        Self::resolve(&state, state.current)
    }

    /// Flags of `mode`: the override if one is set, otherwise the static defaults.
    #[must_use]
    pub fn flags_for(&self, mode: Mode) -> ModeFlags {
        Self::resolve(&self.state.read(), mode)
    }

    /// Policy view of the active mode's flags.
    #[must_use]
    pub fn behavior(&self) -> ModeBehavior {
        ModeBehavior::new(self.flags())
    }

    /// Replaces the flags used for `mode` until [`clear_overrides`](Self::clear_overrides).
    pub fn override_flags(&self, mode: Mode, flags: ModeFlags) {
        debug!(mode = %mode, ?flags, "Mode flags overridden");
        self.state.write().overrides.insert(mode, flags);
    }

    /// Drops every override.
    pub fn clear_overrides(&self) {
        self.state.write().overrides.clear();
    }

    fn resolve(state: &ModeState, mode: Mode) -> ModeFlags {
        state
            .overrides
            .get(&mode)
            .copied()
            .unwrap_or_else(|| ModeFlags::defaults_for(mode))
    }
}

impl std::fmt::Debug for ModeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ModeManager")
            .field("current", &state.current)
            .field("overrides", &state.overrides.len())
            .finish_non_exhaustive()
    }
}
