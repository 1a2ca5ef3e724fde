//! Typing indicator tracking.
//!
//! Remote typers are tracked by nick in a set; the local side is an
//! edge-triggered flag so the mesh sees one broadcast per typing burst, not
//! one per keystroke. The ticker phase drives the cycling ellipsis the UI
//! renders next to the indicator.

use std::collections::HashSet;
use tracing::debug;

/// The two fixed ellipsis strings the ticker cycles between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerPhase {
    /// The shorter ellipsis.
    Short,
    /// The longer ellipsis.
    Long,
}

impl TickerPhase {
    /// The ellipsis string for this phase.
    #[must_use]
    pub fn ellipsis(self) -> &'static str {
        match self {
            TickerPhase::Short => "..",
            TickerPhase::Long => "...",
        }
    }

    #[must_use]
    fn toggled(self) -> Self {
        match self {
            TickerPhase::Short => TickerPhase::Long,
            TickerPhase::Long => TickerPhase::Short,
        }
    }
}

/// The set of peers currently believed to be composing a message.
#[derive(Debug)]
pub struct TypingTracker {
    typers: HashSet<String>,
    phase: TickerPhase,
}

impl TypingTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            typers: HashSet::new(),
            phase: TickerPhase::Short,
        }
    }

    /// Apply a remote `typingChange` signal.
    pub fn set_typing(&mut self, nick: &str, is_typing: bool) {
        if is_typing {
            if self.typers.insert(nick.to_string()) {
                debug!(nick = %nick, "Typing: started");
            }
        } else {
            self.remove_typer(nick);
        }
    }

    /// Remove a nick from the typer set.
    ///
    /// Idempotent; called on explicit stop signals, on chat arrival from that
    /// nick, and when that peer's stream is torn down.
    pub fn remove_typer(&mut self, nick: &str) {
        if self.typers.remove(nick) {
            debug!(nick = %nick, "Typing: stopped");
        }
    }

    /// Check if a nick is currently tracked as typing.
    #[must_use]
    pub fn is_typing(&self, nick: &str) -> bool {
        self.typers.contains(nick)
    }

    /// Number of tracked typers.
    #[must_use]
    pub fn typer_count(&self) -> usize {
        self.typers.len()
    }

    /// Check if nobody is typing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.typers.is_empty()
    }

    /// Advance the ellipsis ticker. The phase only cycles while someone is
    /// typing; an idle indicator does not animate.
    pub fn tick(&mut self) {
        if !self.typers.is_empty() {
            self.phase = self.phase.toggled();
        }
    }

    /// Current ticker phase.
    #[must_use]
    pub fn phase(&self) -> TickerPhase {
        self.phase
    }

    /// The indicator line the UI renders, if anyone is typing.
    ///
    /// Exactly one typer shows their nick followed by the ellipsis; more than
    /// one shows just the cycling ellipsis, never a name list. The two-branch
    /// rule is an intentional simplification.
    #[must_use]
    pub fn indicator(&self) -> Option<String> {
        match self.typers.len() {
            0 => None,
            1 => {
                let nick = self.typers.iter().next().unwrap();
                Some(format!("{}{}", nick, self.phase.ellipsis()))
            }
            _ => Some(self.phase.ellipsis().to_string()),
        }
    }
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge-triggered local typing flag.
///
/// Broadcasting happens only on the empty/non-empty transitions of the input
/// buffer, which keeps the mesh free of per-keystroke traffic.
#[derive(Debug, Default)]
pub struct LocalTypingFlag {
    sent: bool,
}

impl LocalTypingFlag {
    /// Observe the input buffer after a local edit.
    ///
    /// Returns `Some(typing)` when a `typingChange{typing}` broadcast is due:
    /// `Some(true)` the instant text becomes non-empty, `Some(false)` the
    /// instant it becomes empty, `None` for every keystroke in between.
    pub fn on_input(&mut self, text: &str) -> Option<bool> {
        if !text.is_empty() && !self.sent {
            self.sent = true;
            Some(true)
        } else if text.is_empty() && self.sent {
            self.sent = false;
            Some(false)
        } else {
            None
        }
    }

    /// Reset without broadcasting, after a message is sent. The next
    /// keystroke re-triggers a `typingChange{true}`.
    pub fn reset(&mut self) {
        self.sent = false;
    }

    /// Whether the mesh currently believes we are typing.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_typing_is_set_semantics() {
        let mut tracker = TypingTracker::new();

        tracker.set_typing("Bob", true);
        tracker.set_typing("Bob", true);
        assert_eq!(tracker.typer_count(), 1);

        tracker.set_typing("Bob", false);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_remove_typer_idempotent() {
        let mut tracker = TypingTracker::new();
        tracker.set_typing("Bob", true);

        tracker.remove_typer("Alice"); // Absent nick, no effect
        assert_eq!(tracker.typer_count(), 1);

        tracker.remove_typer("Bob");
        tracker.remove_typer("Bob");
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_indicator_two_branch_rule() {
        let mut tracker = TypingTracker::new();
        assert_eq!(tracker.indicator(), None);

        tracker.set_typing("Bob", true);
        assert_eq!(tracker.indicator(), Some("Bob..".to_string()));

        tracker.set_typing("Carol", true);
        // Multiple typers: ellipsis only, no names.
        assert_eq!(tracker.indicator(), Some("..".to_string()));
    }

    #[test]
    fn test_ticker_only_cycles_while_typing() {
        let mut tracker = TypingTracker::new();

        tracker.tick();
        assert_eq!(tracker.phase(), TickerPhase::Short);

        tracker.set_typing("Bob", true);
        tracker.tick();
        assert_eq!(tracker.phase(), TickerPhase::Long);
        assert_eq!(tracker.indicator(), Some("Bob...".to_string()));
        tracker.tick();
        assert_eq!(tracker.phase(), TickerPhase::Short);
    }

    #[test]
    fn test_local_flag_edges_only() {
        let mut flag = LocalTypingFlag::default();

        assert_eq!(flag.on_input("h"), Some(true));
        assert_eq!(flag.on_input("hi"), None);
        assert_eq!(flag.on_input("hi!"), None);
        assert_eq!(flag.on_input(""), Some(false));
        assert_eq!(flag.on_input(""), None);
    }

    #[test]
    fn test_local_flag_reset_rearms() {
        let mut flag = LocalTypingFlag::default();
        assert_eq!(flag.on_input("hi"), Some(true));

        flag.reset();
        assert!(!flag.is_sent());
        assert_eq!(flag.on_input("x"), Some(true));
    }
}
