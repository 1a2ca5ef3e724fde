//! Codec for chatmesh broadcast bodies.
//!
//! Bodies are MessagePack-encoded with named fields. The transport frames the
//! kind tag separately, so there is no length prefix here; a broadcast body is
//! always a single datagram.

use bytes::Bytes;
use thiserror::Error;

use crate::payloads::{kind, ChatPayload, Packet, TypingChange};

/// Maximum broadcast body size (64 KiB).
///
/// A chat message is a few hundred bytes at most; anything near this limit is
/// either a bug or a hostile peer, and is rejected before decoding.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Protocol errors that can occur during encoding/decoding.
///
/// All of these are recoverable: a malformed inbound broadcast is logged and
/// dropped by the router, never fatal to the session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Body exceeds maximum size.
    #[error("Body size {0} exceeds maximum {MAX_BODY_SIZE}")]
    BodyTooLarge(usize),

    /// Cannot encode a packet whose kind this client does not define.
    #[error("Cannot encode unknown kind: {0}")]
    UnknownKind(String),

    /// MessagePack encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding error.
    #[error("Decoding error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Encode a packet into its kind tag and body bytes.
///
/// # Errors
///
/// Returns an error if the packet is `Unknown`, the body is too large, or
/// encoding fails.
pub fn encode(packet: &Packet) -> Result<(&'static str, Bytes), ProtocolError> {
    let (tag, body) = match packet {
        Packet::Chat(payload) => (kind::CHAT, rmp_serde::to_vec_named(payload)?),
        Packet::ChangeNick(nick) => (kind::CHANGE_NICK, rmp_serde::to_vec_named(nick)?),
        Packet::TypingChange(typing) => (
            kind::TYPING_CHANGE,
            rmp_serde::to_vec_named(&TypingChange { typing: *typing })?,
        ),
        Packet::Unknown(k) => return Err(ProtocolError::UnknownKind(k.clone())),
    };

    if body.len() > MAX_BODY_SIZE {
        return Err(ProtocolError::BodyTooLarge(body.len()));
    }

    Ok((tag, Bytes::from(body)))
}

/// Decode a broadcast body by its kind tag.
///
/// Unrecognized kinds decode to [`Packet::Unknown`] rather than an error, so
/// newer peers never break older clients.
///
/// # Errors
///
/// Returns an error if the body is too large or fails to decode as the shape
/// its kind demands.
pub fn decode(tag: &str, body: &[u8]) -> Result<Packet, ProtocolError> {
    if body.len() > MAX_BODY_SIZE {
        return Err(ProtocolError::BodyTooLarge(body.len()));
    }

    match tag {
        kind::CHAT => {
            let payload: ChatPayload = rmp_serde::from_slice(body)?;
            Ok(Packet::Chat(payload))
        }
        kind::CHANGE_NICK => {
            let nick: String = rmp_serde::from_slice(body)?;
            Ok(Packet::ChangeNick(nick))
        }
        kind::TYPING_CHANGE => {
            let change: TypingChange = rmp_serde::from_slice(body)?;
            Ok(Packet::TypingChange(change.typing))
        }
        other => Ok(Packet::Unknown(other.to_string())),
    }
}
