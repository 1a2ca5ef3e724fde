//! The chat log store.
//!
//! An append-only, unbounded record of chat entries, owned exclusively by the
//! session. Rather than making the rendering layer poll the log length, every
//! append pushes the new entry onto a broadcast channel it subscribes to.

use tokio::sync::broadcast;
use tracing::trace;

/// Subscriber channel capacity. A renderer that lags this far behind simply
/// misses entries; the log itself is never truncated.
const SUBSCRIBER_CAPACITY: usize = 256;

/// One entry in the chat log.
///
/// Entries are immutable once appended; append order is the only ordering
/// guarantee (no cross-peer timestamp reconciliation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEntry {
    /// A user-authored message.
    Message {
        /// Display name of the author at send time.
        username: String,
        /// The message text.
        payload: String,
    },
    /// A system-generated entry (join/leave/rename), rendered without an
    /// attributed username.
    Notification {
        /// The notification text.
        payload: String,
    },
}

impl ChatEntry {
    /// Create a message entry.
    #[must_use]
    pub fn message(username: impl Into<String>, payload: impl Into<String>) -> Self {
        ChatEntry::Message {
            username: username.into(),
            payload: payload.into(),
        }
    }

    /// Create a notification entry.
    #[must_use]
    pub fn notification(payload: impl Into<String>) -> Self {
        ChatEntry::Notification {
            payload: payload.into(),
        }
    }
}

/// The append-only chat log.
#[derive(Debug)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
    changes: broadcast::Sender<ChatEntry>,
}

impl ChatLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            entries: Vec::new(),
            changes,
        }
    }

    /// Append an entry. No deduplication, no size cap.
    pub fn append(&mut self, entry: ChatEntry) {
        trace!(?entry, "Log append");
        // No receivers is fine; the notification is best-effort.
        let _ = self.changes.send(entry.clone());
        self.entries.push(entry);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in append order.
    #[must_use]
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    /// Subscribe to appended entries.
    ///
    /// Each receiver sees every entry appended after the call, in append
    /// order. This is the rendering layer's change notification.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEntry> {
        self.changes.subscribe()
    }
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order_and_length() {
        let mut log = ChatLog::new();
        assert!(log.is_empty());

        log.append(ChatEntry::message("Alice", "one"));
        log.append(ChatEntry::notification("A peer joined the room!"));
        log.append(ChatEntry::message("Bob", "two"));

        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[0], ChatEntry::message("Alice", "one"));
        assert_eq!(
            log.entries()[1],
            ChatEntry::notification("A peer joined the room!")
        );
        assert_eq!(log.entries()[2], ChatEntry::message("Bob", "two"));
    }

    #[tokio::test]
    async fn test_subscribers_see_appends_in_order() {
        let mut log = ChatLog::new();
        let mut rx = log.subscribe();

        log.append(ChatEntry::message("Alice", "hi"));
        log.append(ChatEntry::message("Alice", "there"));

        assert_eq!(rx.recv().await.unwrap(), ChatEntry::message("Alice", "hi"));
        assert_eq!(
            rx.recv().await.unwrap(),
            ChatEntry::message("Alice", "there")
        );
    }

    #[test]
    fn test_append_without_subscribers() {
        let mut log = ChatLog::new();
        log.append(ChatEntry::notification("A peer left the room!"));
        assert_eq!(log.len(), 1);
    }
}
