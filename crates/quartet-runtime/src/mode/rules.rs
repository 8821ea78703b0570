//! Pure policy decisions derived from [`ModeFlags`].

use quartet_types::ModeFlags;

/// Allow/deny decisions for one set of flags.
///
/// Holds no state beyond the flags it was built from.
///
/// # Example
///
/// ```
/// use quartet_runtime::mode::ModeBehavior;
/// use quartet_types::{Mode, ModeFlags};
///
/// let debug = ModeBehavior::new(ModeFlags::defaults_for(Mode::Debug));
/// assert!(debug.should_generate_agent_prompt(true));
/// assert!(debug.should_run_fallback_diagnostics(false));
///
/// let smart = ModeBehavior::new(ModeFlags::defaults_for(Mode::Smart));
/// assert!(!smart.should_generate_agent_prompt(true));
/// assert!(!smart.should_run_fallback_diagnostics(false));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeBehavior {
    flags: ModeFlags,
}

impl ModeBehavior {
    #[must_use]
    pub const fn new(flags: ModeFlags) -> Self {
        Self { flags }
    }

    #[must_use]
    pub fn flags(&self) -> ModeFlags {
        self.flags
    }

    #[must_use]
    pub fn should_monitor_process(&self) -> bool {
        self.flags.enable_process_monitor
    }

    #[must_use]
    pub fn should_enable_debugging(&self) -> bool {
        self.flags.enable_debugging
    }

    #[must_use]
    pub fn should_enable_automation(&self) -> bool {
        self.flags.enable_automation
    }

    #[must_use]
    pub fn should_enable_insight(&self) -> bool {
        self.flags.enable_insight
    }

    /// Debugging may escalate to an agent that is both present and permitted.
    #[must_use]
    pub fn should_generate_agent_prompt(&self, agent_available: bool) -> bool {
        agent_available && self.flags.allow_agent_escalation && self.flags.enable_debugging
    }

    /// Debugging must fall back to local heuristics.
    #[must_use]
    pub fn should_run_fallback_diagnostics(&self, agent_available: bool) -> bool {
        self.flags.enable_debugging && (!agent_available || !self.flags.allow_agent_escalation)
    }
}

impl From<ModeFlags> for ModeBehavior {
    fn from(flags: ModeFlags) -> Self {
        Self::new(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quartet_types::Mode;

    #[test]
    fn agent_prompt_requires_escalation_and_debugging() {
        for mode in Mode::ALL {
            let b = ModeBehavior::new(ModeFlags::defaults_for(mode));
            let expected = matches!(mode, Mode::Debug | Mode::Automation);
            assert_eq!(b.should_generate_agent_prompt(true), expected, "{mode}");
            assert!(!b.should_generate_agent_prompt(false), "{mode}");
        }
    }

    #[test]
    fn fallback_when_agent_missing_or_forbidden() {
        let debug = ModeBehavior::new(ModeFlags::defaults_for(Mode::Debug));
        assert!(debug.should_run_fallback_diagnostics(false));
        assert!(!debug.should_run_fallback_diagnostics(true));

        let forbidden = ModeBehavior::new(ModeFlags {
            allow_agent_escalation: false,
            ..ModeFlags::defaults_for(Mode::Debug)
        });
        assert!(forbidden.should_run_fallback_diagnostics(true));
        assert!(!forbidden.should_generate_agent_prompt(true));

        let insight = ModeBehavior::new(ModeFlags::defaults_for(Mode::Insight));
        assert!(!insight.should_run_fallback_diagnostics(false));
    }

    #[test]
    fn family_switches_mirror_flags() {
        let b = ModeBehavior::from(ModeFlags::defaults_for(Mode::Automation));
        assert!(b.should_monitor_process());
        assert!(b.should_enable_debugging());
        assert!(b.should_enable_automation());
        assert!(!b.should_enable_insight());
    }
}
