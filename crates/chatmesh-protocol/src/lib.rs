//! # chatmesh-protocol
//!
//! Application-level protocol for the chatmesh demo client.
//!
//! The mesh transport carries opaque `(kind, body)` broadcasts; this crate
//! defines the three kinds the chat client layers on top of it, their payload
//! shapes, and the MessagePack codec:
//!
//! - `chat` - A user-authored message
//! - `changeNick` - A peer announcing its new display name
//! - `typingChange` - A peer starting or stopping to compose a message
//!
//! ## Example
//!
//! ```rust
//! use chatmesh_protocol::{codec, Packet};
//!
//! let packet = Packet::chat("Alice", "hi");
//! let (kind, body) = codec::encode(&packet).unwrap();
//! let decoded = codec::decode(kind, &body).unwrap();
//! assert_eq!(packet, decoded);
//! ```

pub mod codec;
pub mod payloads;

pub use codec::{decode, encode, ProtocolError};
pub use payloads::{kind, ChatPayload, Packet, TypingChange};
