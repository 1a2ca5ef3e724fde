//! Local nickname state and the best-effort rename.
//!
//! Uniqueness is a snapshot scan of the current peer list. The check races
//! against remote renames arriving between the scan and our broadcast; the
//! mesh offers no atomicity to close that window, so a collision that slips
//! through simply stands. A collision caught by the scan is surfaced as a
//! recoverable error, never swallowed.

use chatmesh_transport::Peer;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

/// Rename errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenameError {
    /// Another peer already uses the proposed nick.
    #[error("Nickname \"{0}\" is already taken")]
    NameUnavailable(String),
}

/// Generate the initial random display name.
#[must_use]
pub fn random_nick() -> String {
    format!("Anon{}", rand::thread_rng().gen_range(0..100_000))
}

/// The local user's display name and rename-editing flag.
#[derive(Debug)]
pub struct NicknameState {
    local_nick: String,
    rename_in_progress: bool,
}

impl NicknameState {
    /// Create with a given nick.
    #[must_use]
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            local_nick: nick.into(),
            rename_in_progress: false,
        }
    }

    /// Create with a random `Anon#####` nick.
    #[must_use]
    pub fn random() -> Self {
        Self::new(random_nick())
    }

    /// The current local display name.
    #[must_use]
    pub fn nick(&self) -> &str {
        &self.local_nick
    }

    /// Whether an edit is underway.
    #[must_use]
    pub fn rename_in_progress(&self) -> bool {
        self.rename_in_progress
    }

    /// Enter editing mode.
    ///
    /// Returns `true` if editing was newly entered. When already in progress
    /// the call is a no-op returning `false`; the caller's confirm path goes
    /// through [`commit`](Self::commit) instead.
    pub fn begin_rename(&mut self) -> bool {
        if self.rename_in_progress {
            false
        } else {
            self.rename_in_progress = true;
            true
        }
    }

    /// Commit a proposed nick against a fresh peer-list snapshot.
    ///
    /// On a collision nothing changes and [`RenameError::NameUnavailable`] is
    /// returned. On success the nick is adopted and editing mode ends; the
    /// caller broadcasts the change and appends the local notification.
    ///
    /// # Errors
    ///
    /// Returns an error if any peer in `peers` already uses `proposed`.
    pub fn commit(&mut self, proposed: &str, peers: &[Peer]) -> Result<(), RenameError> {
        if peers.iter().any(|p| p.nick == proposed) {
            debug!(nick = %proposed, "Rename rejected: nick in use");
            return Err(RenameError::NameUnavailable(proposed.to_string()));
        }

        debug!(old = %self.local_nick, new = %proposed, "Rename committed");
        self.local_nick = proposed.to_string();
        self.rename_in_progress = false;
        Ok(())
    }
}
