//! Payload types for the chatmesh broadcast protocol.
//!
//! Each broadcast carries a string kind tag plus a MessagePack body. The three
//! kinds below are the entire application-level protocol; anything else on the
//! wire is ignored for forward compatibility.

use serde::{Deserialize, Serialize};

/// The broadcast kind tags.
pub mod kind {
    /// A user-authored chat message.
    pub const CHAT: &str = "chat";
    /// A peer announcing a new display name.
    pub const CHANGE_NICK: &str = "changeNick";
    /// A peer starting or stopping to compose a message.
    pub const TYPING_CHANGE: &str = "typingChange";
}

/// Body of a `chat` broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// Display name of the author at send time.
    pub username: String,
    /// The message text.
    pub payload: String,
}

/// Body of a `typingChange` broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingChange {
    /// Whether the sender is currently composing a message.
    pub typing: bool,
}

/// A decoded broadcast.
///
/// `Unknown` carries the unrecognized kind tag so callers can log it; it is
/// not an error, since newer peers may broadcast kinds this client predates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// A user-authored chat message.
    Chat(ChatPayload),
    /// The sender's new display name.
    ChangeNick(String),
    /// The sender started or stopped composing.
    TypingChange(bool),
    /// A kind tag this client does not recognize.
    Unknown(String),
}

impl Packet {
    /// Create a new chat packet.
    #[must_use]
    pub fn chat(username: impl Into<String>, text: impl Into<String>) -> Self {
        Packet::Chat(ChatPayload {
            username: username.into(),
            payload: text.into(),
        })
    }

    /// Create a new nick-change packet.
    #[must_use]
    pub fn change_nick(nick: impl Into<String>) -> Self {
        Packet::ChangeNick(nick.into())
    }

    /// Create a new typing-change packet.
    #[must_use]
    pub fn typing(typing: bool) -> Self {
        Packet::TypingChange(typing)
    }

    /// Get the kind tag for this packet.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Packet::Chat(_) => kind::CHAT,
            Packet::ChangeNick(_) => kind::CHANGE_NICK,
            Packet::TypingChange(_) => kind::TYPING_CHANGE,
            Packet::Unknown(k) => k,
        }
    }
}
