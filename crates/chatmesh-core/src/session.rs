//! The session actor.
//!
//! All session state has a single owner: this actor. Inbound transport events
//! and local commands are consumed by one task whose handlers run to
//! completion before the next begins, so no component needs internal locking.
//! The underlying runtime may be multi-threaded; the serialization happens at
//! the queue, not with locks.

use std::sync::Arc;
use std::time::Duration;

use chatmesh_protocol::{codec, Packet};
use chatmesh_transport::{Peer, Transport, TransportError, TransportEvent};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::log::{ChatEntry, ChatLog};
use crate::nickname::{NicknameState, RenameError};
use crate::presence::PresenceTracker;
use crate::typing::{LocalTypingFlag, TypingTracker};

/// Cadence of the typing-ellipsis ticker.
pub const TICKER_PERIOD: Duration = Duration::from_secs(1);

/// Local user actions, serialized onto the session queue alongside transport
/// events.
#[derive(Debug, Clone)]
pub enum Command {
    /// The input buffer changed (fired per keystroke; broadcasts only on the
    /// empty/non-empty edges).
    InputChanged(String),
    /// Send the pending input buffer as a chat message.
    Send,
    /// Open nickname editing mode.
    BeginRename,
    /// Confirm a proposed nickname.
    CommitRename(String),
}

/// The room session: one local participant's synchronized view.
pub struct Session {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) log: ChatLog,
    pub(crate) presence: PresenceTracker,
    pub(crate) typing: TypingTracker,
    pub(crate) typing_flag: LocalTypingFlag,
    pub(crate) nickname: NicknameState,
    pub(crate) pending_message: String,
    ticker_period: Duration,
}

impl Session {
    /// Create a session with a random `Anon#####` nick.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_nick(transport, NicknameState::random())
    }

    /// Create a session with a specific nickname state.
    #[must_use]
    pub fn with_nick(transport: Arc<dyn Transport>, nickname: NicknameState) -> Self {
        Self {
            transport,
            log: ChatLog::new(),
            presence: PresenceTracker::new(),
            typing: TypingTracker::new(),
            typing_flag: LocalTypingFlag::default(),
            nickname,
            pending_message: String::new(),
            ticker_period: TICKER_PERIOD,
        }
    }

    /// Override the ticker cadence (tests, config).
    #[must_use]
    pub fn with_ticker_period(mut self, period: Duration) -> Self {
        self.ticker_period = period;
        self
    }

    /// The local display name.
    #[must_use]
    pub fn nick(&self) -> &str {
        self.nickname.nick()
    }

    /// Room member count, self included.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.presence.peer_count()
    }

    /// The typing indicator line, if anyone is composing.
    #[must_use]
    pub fn typing_indicator(&self) -> Option<String> {
        self.typing.indicator()
    }

    /// The unsent input buffer.
    #[must_use]
    pub fn pending_message(&self) -> &str {
        &self.pending_message
    }

    /// Read access to the chat log.
    #[must_use]
    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    /// Subscribe to chat log appends (the rendering layer's feed).
    #[must_use]
    pub fn subscribe_log(&self) -> broadcast::Receiver<ChatEntry> {
        self.log.subscribe()
    }

    /// Join a room on the transport. Called once the transport is ready.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the join.
    pub async fn join(&self, room: &str) -> Result<(), TransportError> {
        self.transport.join_room(room).await
    }

    /// Run the actor until both input streams end.
    ///
    /// Transport events and local commands are handled one at a time; the
    /// ticker interleaves as just another handler, so no two transitions ever
    /// observe a half-updated state.
    pub async fn run(
        mut self,
        mut transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let mut ticker = interval(self.ticker_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                event = transport_rx.recv() => match event {
                    Some(event) => self.on_transport_event(event).await,
                    None => {
                        debug!("Transport event stream ended");
                        break;
                    }
                },

                command = commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => {
                        debug!("Command stream ended");
                        break;
                    }
                },

                _ = ticker.tick() => self.tick(),
            }
        }
    }

    /// Handle one transport event.
    pub async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::PeerCreated(peer) => self.on_peer_created(&peer),
            TransportEvent::ConnectionStateChanged => self.on_connection_state_change(),
            TransportEvent::PeerStreamRemoved(peer) => {
                // The departed peer cannot still be composing.
                self.typing.remove_typer(&peer.nick);
            }
            TransportEvent::DataReceived { kind, body, source } => {
                self.route(&kind, &body, &source);
            }
        }
    }

    /// Handle one local command.
    pub async fn on_command(&mut self, command: Command) {
        match command {
            Command::InputChanged(text) => self.on_input_changed(text).await,
            Command::Send => self.send_message().await,
            Command::BeginRename => {
                self.begin_rename();
            }
            Command::CommitRename(nick) => {
                if let Err(e) = self.commit_rename(&nick).await {
                    warn!(error = %e, "Rename not applied");
                }
            }
        }
    }

    /// Advance the typing-ellipsis ticker.
    pub fn tick(&mut self) {
        self.typing.tick();
    }

    /// Record a local edit of the input buffer.
    ///
    /// Broadcasts `typingChange` only on the empty/non-empty edges of the
    /// buffer, never per keystroke.
    pub async fn on_input_changed(&mut self, text: String) {
        let edge = self.typing_flag.on_input(&text);
        self.pending_message = text;
        if let Some(typing) = edge {
            self.broadcast(Packet::typing(typing)).await;
        }
    }

    /// Send the pending input buffer as a chat message.
    ///
    /// No-op on an empty buffer. Appends locally, broadcasts, clears the
    /// buffer, and re-arms the typing edge so the next keystroke announces a
    /// fresh burst. Remote peers clear our typer entry on chat receipt, so no
    /// `typingChange{false}` goes out here.
    pub async fn send_message(&mut self) {
        if self.pending_message.is_empty() {
            return;
        }

        let username = self.nickname.nick().to_string();
        let text = self.pending_message.clone();

        self.log.append(ChatEntry::message(&*username, &*text));
        self.broadcast(Packet::chat(username, text)).await;

        self.pending_message.clear();
        self.typing_flag.reset();
    }

    /// Open nickname editing mode. Returns `true` if newly entered.
    pub fn begin_rename(&mut self) -> bool {
        self.nickname.begin_rename()
    }

    /// Confirm a proposed nickname.
    ///
    /// The uniqueness check is a best-effort scan of the current peer list;
    /// it races against remote renames in flight and is not atomic with the
    /// broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`RenameError::NameUnavailable`] if a peer currently uses the
    /// proposed nick. Nothing is broadcast and no state changes.
    pub async fn commit_rename(&mut self, proposed: &str) -> Result<(), RenameError> {
        let peers = self.transport.current_peers();
        self.nickname.commit(proposed, &peers)?;

        self.broadcast(Packet::change_nick(proposed)).await;
        self.log.append(ChatEntry::notification(format!(
            "You changed your nickname to {}",
            proposed
        )));
        Ok(())
    }

    fn on_peer_created(&mut self, peer: &Peer) {
        debug!(peer = %peer.id, nick = %peer.nick, "Peer created");
        self.log
            .append(ChatEntry::notification("A peer joined the room!"));
    }

    /// Re-derive the member count from a fresh peer-list read.
    fn on_connection_state_change(&mut self) {
        let connected = self.transport.current_peers().len();
        if self.presence.on_connection_state_change(connected) {
            self.log
                .append(ChatEntry::notification("A peer left the room!"));
        }
    }

    /// Fire-and-forget broadcast: failures are logged and dropped, never
    /// retried and never fatal.
    pub(crate) async fn broadcast(&mut self, packet: Packet) {
        match codec::encode(&packet) {
            Ok((kind, body)) => {
                if let Err(e) = self.transport.broadcast(kind, body).await {
                    warn!(kind, error = %e, "Broadcast failed");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode broadcast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chatmesh_protocol::kind;
    use chatmesh_transport::{MeshHub, PeerId};
    use std::sync::Mutex;

    /// Transport double: scripted peer list, recorded broadcasts.
    #[derive(Default)]
    struct RecordingTransport {
        peers: Mutex<Vec<Peer>>,
        broadcasts: Mutex<Vec<(String, Bytes)>>,
    }

    impl RecordingTransport {
        fn set_peers(&self, peers: Vec<Peer>) {
            *self.peers.lock().unwrap() = peers;
        }

        fn sent(&self) -> Vec<(String, Bytes)> {
            self.broadcasts.lock().unwrap().clone()
        }

        fn sent_kinds(&self) -> Vec<String> {
            self.sent().into_iter().map(|(k, _)| k).collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn join_room(&self, _room: &str) -> Result<(), TransportError> {
            Ok(())
        }

        async fn broadcast(&self, kind: &str, body: Bytes) -> Result<usize, TransportError> {
            self.broadcasts
                .lock()
                .unwrap()
                .push((kind.to_string(), body));
            Ok(self.peers.lock().unwrap().len())
        }

        fn current_peers(&self) -> Vec<Peer> {
            self.peers.lock().unwrap().clone()
        }

        fn set_peer_nick(&self, id: &PeerId, nick: &str) -> bool {
            let mut peers = self.peers.lock().unwrap();
            match peers.iter_mut().find(|p| &p.id == id) {
                Some(peer) => {
                    peer.nick = nick.to_string();
                    true
                }
                None => false,
            }
        }
    }

    fn session_with(nick: &str) -> (Session, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let session = Session::with_nick(transport.clone(), NicknameState::new(nick));
        (session, transport)
    }

    fn notifications(session: &Session) -> Vec<String> {
        session
            .log()
            .entries()
            .iter()
            .filter_map(|e| match e {
                ChatEntry::Notification { payload } => Some(payload.clone()),
                ChatEntry::Message { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_send_message_end_to_end() {
        let (mut session, transport) = session_with("Alice");

        session.on_input_changed("hi".to_string()).await;
        session.send_message().await;

        assert_eq!(
            session.log().entries(),
            &[ChatEntry::message("Alice", "hi")]
        );
        assert_eq!(session.pending_message(), "");

        let chats: Vec<_> = transport
            .sent()
            .into_iter()
            .filter(|(k, _)| k == kind::CHAT)
            .collect();
        assert_eq!(chats.len(), 1);
        let decoded = codec::decode(kind::CHAT, &chats[0].1).unwrap();
        assert_eq!(decoded, Packet::chat("Alice", "hi"));
    }

    #[tokio::test]
    async fn test_send_empty_is_noop() {
        let (mut session, transport) = session_with("Alice");

        session.send_message().await;

        assert!(session.log().is_empty());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_typing_broadcasts_on_edges_only() {
        let (mut session, transport) = session_with("Alice");

        session.on_input_changed("h".to_string()).await;
        session.on_input_changed("hi".to_string()).await;
        session.on_input_changed("hi!".to_string()).await;
        session.on_input_changed(String::new()).await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            codec::decode(&sent[0].0, &sent[0].1).unwrap(),
            Packet::typing(true)
        );
        assert_eq!(
            codec::decode(&sent[1].0, &sent[1].1).unwrap(),
            Packet::typing(false)
        );
    }

    #[tokio::test]
    async fn test_send_rearms_typing_edge() {
        let (mut session, transport) = session_with("Alice");

        session.on_input_changed("hi".to_string()).await;
        session.send_message().await;
        session.on_input_changed("again".to_string()).await;

        let kinds = transport.sent_kinds();
        assert_eq!(
            kinds,
            vec![kind::TYPING_CHANGE, kind::CHAT, kind::TYPING_CHANGE]
        );
    }

    #[tokio::test]
    async fn test_presence_drop_three_to_one() {
        let (mut session, transport) = session_with("Alice");

        transport.set_peers(vec![
            Peer::new("p1", "Bob"),
            Peer::new("p2", "Carol"),
            Peer::new("p3", "Dave"),
        ]);
        session
            .on_transport_event(TransportEvent::ConnectionStateChanged)
            .await;
        assert_eq!(session.peer_count(), 4);

        transport.set_peers(vec![Peer::new("p1", "Bob")]);
        session
            .on_transport_event(TransportEvent::ConnectionStateChanged)
            .await;

        assert_eq!(session.peer_count(), 2);
        assert_eq!(notifications(&session), vec!["A peer left the room!"]);
    }

    #[tokio::test]
    async fn test_one_join_one_notification() {
        let (mut session, transport) = session_with("Alice");

        // A physical join surfaces as both a peer-created event and a count
        // increase; only the former announces it.
        let bob = Peer::new("p1", "Bob");
        transport.set_peers(vec![bob.clone()]);
        session
            .on_transport_event(TransportEvent::PeerCreated(bob))
            .await;
        session
            .on_transport_event(TransportEvent::ConnectionStateChanged)
            .await;

        assert_eq!(session.peer_count(), 2);
        assert_eq!(notifications(&session), vec!["A peer joined the room!"]);
    }

    #[tokio::test]
    async fn test_typer_cleared_on_stream_removed() {
        let (mut session, transport) = session_with("Alice");
        let bob = Peer::new("p1", "Bob");

        let (k, body) = codec::encode(&Packet::typing(true)).unwrap();
        session
            .on_transport_event(TransportEvent::DataReceived {
                kind: k.to_string(),
                body,
                source: bob.clone(),
            })
            .await;
        assert_eq!(session.typing_indicator(), Some("Bob..".to_string()));

        session
            .on_transport_event(TransportEvent::PeerStreamRemoved(bob))
            .await;

        assert_eq!(session.typing_indicator(), None);
        // No typing:false was ever sent by anyone.
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_chat_receipt_clears_typer() {
        let (mut session, _transport) = session_with("Alice");
        let bob = Peer::new("p1", "Bob");

        let (k, body) = codec::encode(&Packet::typing(true)).unwrap();
        session
            .on_transport_event(TransportEvent::DataReceived {
                kind: k.to_string(),
                body,
                source: bob.clone(),
            })
            .await;

        let (k, body) = codec::encode(&Packet::chat("Bob", "done")).unwrap();
        session
            .on_transport_event(TransportEvent::DataReceived {
                kind: k.to_string(),
                body,
                source: bob,
            })
            .await;

        assert_eq!(session.typing_indicator(), None);
        assert_eq!(session.log().entries(), &[ChatEntry::message("Bob", "done")]);
    }

    #[tokio::test]
    async fn test_rename_conflict_changes_nothing() {
        let (mut session, transport) = session_with("Anon1");
        transport.set_peers(vec![Peer::new("p1", "Anon1")]);

        session.begin_rename();
        let result = session.commit_rename("Anon1").await;

        assert_eq!(result, Err(RenameError::NameUnavailable("Anon1".into())));
        assert_eq!(session.nick(), "Anon1");
        assert!(transport.sent().is_empty());
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn test_rename_success_broadcasts_once() {
        let (mut session, transport) = session_with("Anon1");
        transport.set_peers(vec![Peer::new("p1", "Bob")]);

        session.begin_rename();
        session.commit_rename("Alice").await.unwrap();

        assert_eq!(session.nick(), "Alice");
        assert_eq!(transport.sent_kinds(), vec![kind::CHANGE_NICK]);
        assert_eq!(
            notifications(&session),
            vec!["You changed your nickname to Alice"]
        );
    }

    #[tokio::test]
    async fn test_remote_rename_updates_peer_and_typers() {
        let (mut session, transport) = session_with("Alice");
        let bob = Peer::new("p1", "Bob");
        transport.set_peers(vec![bob.clone()]);

        let (k, body) = codec::encode(&Packet::typing(true)).unwrap();
        session
            .on_transport_event(TransportEvent::DataReceived {
                kind: k.to_string(),
                body,
                source: bob.clone(),
            })
            .await;

        let (k, body) = codec::encode(&Packet::change_nick("Robert")).unwrap();
        session
            .on_transport_event(TransportEvent::DataReceived {
                kind: k.to_string(),
                body,
                source: bob,
            })
            .await;

        assert_eq!(transport.current_peers()[0].nick, "Robert");
        assert_eq!(
            notifications(&session),
            vec!["Bob changed their nickname to Robert"]
        );
        assert_eq!(session.typing_indicator(), None);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_leave_state_untouched() {
        let (mut session, transport) = session_with("Alice");
        let bob = Peer::new("p1", "Bob");

        session
            .on_transport_event(TransportEvent::DataReceived {
                kind: "reaction".to_string(),
                body: Bytes::from_static(b"\xc0"),
                source: bob.clone(),
            })
            .await;

        // A typingChange body where a chat body is expected.
        let (_, body) = codec::encode(&Packet::typing(true)).unwrap();
        session
            .on_transport_event(TransportEvent::DataReceived {
                kind: kind::CHAT.to_string(),
                body,
                source: bob,
            })
            .await;

        assert!(session.log().is_empty());
        assert_eq!(session.typing_indicator(), None);
        assert_eq!(session.peer_count(), 1);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_session_over_in_memory_mesh() {
        let hub = MeshHub::new();
        let (alice_transport, mut alice_rx) = hub.attach("Alice");
        let (bob_transport, _bob_rx) = hub.attach("Bob");

        let mut alice = Session::with_nick(
            Arc::new(alice_transport),
            NicknameState::new("Alice"),
        );
        alice.join("demo").await.unwrap();
        bob_transport.join_room("demo").await.unwrap();

        let (k, body) = codec::encode(&Packet::chat("Bob", "hello")).unwrap();
        bob_transport.broadcast(k, body).await.unwrap();

        while let Ok(event) = alice_rx.try_recv() {
            alice.on_transport_event(event).await;
        }

        assert_eq!(alice.peer_count(), 2);
        assert_eq!(
            notifications(&alice),
            vec!["A peer joined the room!"]
        );
        assert_eq!(
            alice.log().entries().last(),
            Some(&ChatEntry::message("Bob", "hello"))
        );
    }
}
