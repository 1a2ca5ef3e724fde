//! Room membership tracking.
//!
//! The transport does not say who left, only that connectivity changed; the
//! tracker infers a departure from the member count dropping between two
//! reads. Joins are announced separately by the `peer_created` event, so a
//! count increase is silent here.

use tracing::debug;

/// Tracks how many participants are in the room, self included.
#[derive(Debug)]
pub struct PresenceTracker {
    peer_count: usize,
}

impl PresenceTracker {
    /// Create a tracker for a freshly joined room (just us).
    #[must_use]
    pub fn new() -> Self {
        Self { peer_count: 1 }
    }

    /// Current member count, including the local user. Always >= 1.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peer_count
    }

    /// Re-derive the count from a fresh peer-list read.
    ///
    /// `connected_peers` is the length of the transport's current peer list;
    /// the stored count adds one for self. Returns `true` if the count
    /// dropped, meaning a peer left and the caller should append the leave
    /// notification. The count is compared against the previous value before
    /// being stored; the disconnect callback fires at a different point than
    /// the count mutation, which is why leaves are inferred here at all.
    pub fn on_connection_state_change(&mut self, connected_peers: usize) -> bool {
        let new_count = connected_peers + 1;
        let peer_left = self.peer_count > new_count;
        if self.peer_count != new_count {
            debug!(
                old = self.peer_count,
                new = new_count,
                "Presence: member count changed"
            );
        }
        self.peer_count = new_count;
        peer_left
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}
