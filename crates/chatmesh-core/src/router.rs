//! Inbound broadcast dispatch.
//!
//! Every `dataReceived` event lands here: decode by kind tag, then hand the
//! payload to the component that owns that piece of state. Unknown kinds are
//! ignored for forward compatibility; malformed bodies are logged and dropped
//! rather than allowed to fault the session.

use chatmesh_protocol::{codec, Packet};
use chatmesh_transport::Peer;
use tracing::{debug, warn};

use crate::log::ChatEntry;
use crate::session::Session;

impl Session {
    /// Dispatch one inbound broadcast.
    pub fn route(&mut self, kind: &str, body: &[u8], source: &Peer) {
        let packet = match codec::decode(kind, body) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(kind, peer = %source.id, error = %e, "Dropped malformed broadcast");
                return;
            }
        };

        match packet {
            Packet::Chat(chat) => {
                self.log
                    .append(ChatEntry::message(chat.username, chat.payload));
                // A message from a peer means they are no longer composing it.
                self.typing.remove_typer(&source.nick);
            }
            Packet::ChangeNick(new_nick) => self.apply_remote_rename(source, &new_nick),
            Packet::TypingChange(typing) => self.typing.set_typing(&source.nick, typing),
            Packet::Unknown(k) => {
                debug!(kind = %k, peer = %source.id, "Ignored unknown broadcast kind");
            }
        }
    }

    /// Apply a remote peer's announced rename.
    ///
    /// The transport owns peer identity, so the nick mutation is requested
    /// there; a renamed peer cannot stay tracked as a typer under its old
    /// name.
    fn apply_remote_rename(&mut self, source: &Peer, new_nick: &str) {
        let old_nick = source.nick.clone();
        if !self.transport.set_peer_nick(&source.id, new_nick) {
            debug!(peer = %source.id, "Rename for peer the transport no longer knows");
        }
        self.log.append(ChatEntry::notification(format!(
            "{} changed their nickname to {}",
            old_nick, new_nick
        )));
        self.typing.remove_typer(&old_nick);
    }
}
