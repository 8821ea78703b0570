//! Classification of capability names by dotted prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityCategory {
    Core,
    Process,
    Debug,
    Automation,
    Insight,
}

impl CapabilityCategory {
    /// Every category in reporting order.
    pub const ALL: [CapabilityCategory; 5] = [
        Self::Core,
        Self::Process,
        Self::Debug,
        Self::Automation,
        Self::Insight,
    ];

    /// Classifies a capability name. Unknown prefixes are [`Core`](Self::Core).
    ///
    /// ```
    /// use quartet_runtime::capability::CapabilityCategory;
    ///
    /// assert_eq!(CapabilityCategory::classify("debug.debug_last_error"), CapabilityCategory::Debug);
    /// assert_eq!(CapabilityCategory::classify(" Insight.Analyze "), CapabilityCategory::Insight);
    /// assert_eq!(CapabilityCategory::classify("mode.set"), CapabilityCategory::Core);
    /// assert_eq!(CapabilityCategory::classify("weather"), CapabilityCategory::Core);
    /// ```
    #[must_use]
    pub fn classify(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        let prefixed = |p: &str| name.starts_with(p);
        if prefixed("debug.") {
            Self::Debug
        } else if prefixed("automation.") {
            Self::Automation
        } else if prefixed("insight.") {
            Self::Insight
        } else if prefixed("process.") {
            Self::Process
        } else {
            // mode.*, task.*, event.* and anything unrecognized
            Self::Core
        }
    }

    /// Stable machine key.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Process => "process",
            Self::Debug => "debug",
            Self::Automation => "automation",
            Self::Insight => "insight",
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Core => "Core",
            Self::Process => "Process",
            Self::Debug => "Debug",
            Self::Automation => "Automation",
            Self::Insight => "Insight",
        }
    }
}

impl fmt::Display for CapabilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
