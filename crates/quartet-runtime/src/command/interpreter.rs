//! Free text to [`Command`].
//!
//! # Algorithm
//!
//! 1. Lowercase the input. Blank input is a `noop` with confidence 1.0.
//! 2. Walk [`MODE_SYNONYMS`] in table order, then phrase order, and take the
//!    **first** phrase that occurs as a substring. Later, longer or more
//!    specific phrases are never considered once one hits, so
//!    `"summarize the debug log"` resolves to Debug.
//! 3. No hit: `unknown`, confidence 0.0.
//! 4. Confidence, in tenths: 7, +2 if `mode` occurs, +1 if any switch verb
//!    occurs as a substring, capped at 10.
//! 5. `set_mode` if a switch verb occurs as a whole word or `mode` occurs,
//!    otherwise `mention_mode`.

use super::{Command, CommandKind};
use crate::mode::ModeManager;
use quartet_types::Mode;
use tracing::debug;

/// Ordered synonym table. Order is significant.
pub const MODE_SYNONYMS: [(Mode, &[&str]); 4] = [
    (Mode::Smart, &["smart", "assistant", "help", "normal"]),
    (
        Mode::Debug,
        &[
            "debug",
            "debugging",
            "diagnostic",
            "troubleshoot",
            "troubleshooting",
        ],
    ),
    (
        Mode::Automation,
        &["automation", "automate", "workflow", "run tasks", "execute"],
    ),
    (
        Mode::Insight,
        &[
            "insight",
            "analysis",
            "analyse",
            "analytics",
            "summarize",
            "summary",
        ],
    ),
];

/// Verbs signalling a switch request.
pub const SWITCH_VERBS: [&str; 8] = [
    "switch", "set", "use", "go", "enter", "change", "turn on", "enable",
];

/// Stateless interpreter.
///
/// # Example
///
/// ```
/// use quartet_runtime::command::{CommandInterpreter, CommandKind};
/// use quartet_types::Mode;
///
/// let cmd = CommandInterpreter::interpret("Switch to Debugging Mode");
/// assert_eq!(cmd.kind, CommandKind::SetMode);
/// assert_eq!(cmd.mode, Some(Mode::Debug));
/// assert_eq!(cmd.confidence, 1.0);
/// ```
pub struct CommandInterpreter;

impl CommandInterpreter {
    /// Interprets `text` without side effects.
    #[must_use]
    pub fn interpret(text: &str) -> Command {
        let lowered = text.trim().to_lowercase();
        if lowered.is_empty() {
            return Command::noop(text);
        }

        let Some((mode, phrase)) = first_match(&lowered) else {
            debug!(raw = text, "No mode phrase matched");
            return Command::unknown(text);
        };

        let has_mode_word = lowered.contains("mode");
        let has_verb = SWITCH_VERBS.iter().any(|v| lowered.contains(v));
        let wants_switch = has_mode_word || SWITCH_VERBS.iter().any(|v| contains_word(&lowered, v));

        let mut tenths: u8 = 7;
        if has_mode_word {
            tenths += 2;
        }
        if has_verb {
            tenths += 1;
        }
        let tenths = tenths.min(10);
        let kind = if wants_switch {
            CommandKind::SetMode
        } else {
            CommandKind::MentionMode
        };

        debug!(raw = text, %mode, phrase, %kind, tenths, "Interpreted command");
        Command {
            raw: text.to_string(),
            kind,
            mode: Some(mode),
            confidence: f64::from(tenths) / 10.0,
            matched_phrase: phrase.to_string(),
        }
    }

    /// Interprets `text` and applies a `set_mode` result to `modes`.
    pub fn interpret_and_apply(text: &str, modes: &ModeManager) -> Command {
        let command = Self::interpret(text);
        if let (CommandKind::SetMode, Some(mode)) = (command.kind, command.mode) {
            modes.set_mode(mode, &format!("command: {}", command.raw));
        }
        command
    }
}

/// Shorthand for [`CommandInterpreter::interpret`].
#[must_use]
pub fn interpret(text: &str) -> Command {
    CommandInterpreter::interpret(text)
}

fn first_match(lowered: &str) -> Option<(Mode, &'static str)> {
    MODE_SYNONYMS.iter().find_map(|(mode, phrases)| {
        phrases
            .iter()
            .find(|p| lowered.contains(*p))
            .map(|p| (*mode, *p))
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True if `needle` occurs in `haystack` bounded by non-word characters.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}
