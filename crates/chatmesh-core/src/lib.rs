//! # chatmesh-core
//!
//! Session state synchronization for the chatmesh client.
//!
//! This crate turns a stream of asynchronous, unordered peer events and
//! broadcast messages into a consistent local view of the room:
//!
//! - **ChatLog** - Append-only record of messages and system notifications
//! - **PresenceTracker** - Room membership count and leave detection
//! - **TypingTracker** - Who is composing a message, with the ellipsis ticker
//! - **NicknameState** - The local display name and its best-effort rename
//! - **Session** - The single-owner actor that serializes every transition
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌───────────────────┐
//! │  Transport  │────▶│   Session   │────▶│ Presence / Typing │
//! └─────────────┘     └─────────────┘     │ Nickname / Log    │
//!                            ▲            └───────────────────┘
//!                     local commands
//! ```
//!
//! All state lives behind the session actor; the rendering layer observes it
//! through the chat log's subscription channel and read-only accessors.

pub mod log;
pub mod nickname;
pub mod presence;
pub mod router;
pub mod session;
pub mod typing;

pub use log::{ChatEntry, ChatLog};
pub use nickname::{NicknameState, RenameError};
pub use presence::PresenceTracker;
pub use session::{Command, Session};
pub use typing::{LocalTypingFlag, TypingTracker};
