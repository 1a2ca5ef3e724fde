//! In-process mesh for chatmesh.
//!
//! [`MeshHub`] plays the role of the peer-to-peer fabric: every attached
//! endpoint can broadcast to every other endpoint in the same room, with no
//! central relay for application data and no delivery acknowledgment. It backs
//! the demo binary and the test suite; a real deployment would put a WebRTC
//! mesh behind the same [`Transport`] trait.

use crate::traits::{Peer, PeerId, Transport, TransportError, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// One attached endpoint, as the hub sees it.
struct Endpoint {
    /// Display name last announced by this endpoint.
    nick: String,
    /// Room the endpoint has joined, if any.
    room: Option<String>,
    /// Event queue feeding this endpoint's session.
    tx: mpsc::UnboundedSender<TransportEvent>,
}

/// An in-memory mesh of endpoints.
///
/// Cloning the hub is cheap; all clones share the same registry.
#[derive(Clone, Default)]
pub struct MeshHub {
    endpoints: Arc<DashMap<PeerId, Endpoint>>,
}

impl MeshHub {
    /// Create a new, empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new endpoint to the mesh.
    ///
    /// Returns the endpoint's transport handle and the receiver its session
    /// consumes events from. The endpoint is invisible to other participants
    /// until it joins a room.
    pub fn attach(&self, nick: impl Into<String>) -> (MeshTransport, mpsc::UnboundedReceiver<TransportEvent>) {
        let id = PeerId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        let nick = nick.into();

        self.endpoints.insert(
            id.clone(),
            Endpoint {
                nick: nick.clone(),
                room: None,
                tx,
            },
        );

        debug!(peer = %id, nick = %nick, "Endpoint attached");

        (
            MeshTransport {
                hub: self.clone(),
                id,
            },
            rx,
        )
    }

    /// Number of attached endpoints.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Snapshot the peers sharing a room with `id`, excluding `id` itself.
    fn room_peers(&self, id: &PeerId) -> Vec<Peer> {
        let Some(room) = self.room_of(id) else {
            return Vec::new();
        };
        self.endpoints
            .iter()
            .filter(|e| e.key() != id && e.value().room.as_deref() == Some(room.as_str()))
            .map(|e| Peer::new(e.key().clone(), e.value().nick.clone()))
            .collect()
    }

    fn room_of(&self, id: &PeerId) -> Option<String> {
        self.endpoints.get(id).and_then(|e| e.value().room.clone())
    }

    fn peer_record(&self, id: &PeerId) -> Option<Peer> {
        self.endpoints
            .get(id)
            .map(|e| Peer::new(id.clone(), e.value().nick.clone()))
    }

    /// Deliver an event to one endpoint, dropping it if the receiver is gone.
    fn deliver(&self, target: &PeerId, event: TransportEvent) {
        if let Some(entry) = self.endpoints.get(target) {
            if entry.value().tx.send(event).is_err() {
                trace!(peer = %target, "Dropped event for closed endpoint");
            }
        }
    }

    fn join(&self, id: &PeerId, room: &str) -> Result<(), TransportError> {
        let joiner = {
            let mut entry = self
                .endpoints
                .get_mut(id)
                .ok_or(TransportError::NotAttached)?;
            entry.value_mut().room = Some(room.to_string());
            Peer::new(id.clone(), entry.value().nick.clone())
        };

        let existing = self.room_peers(id);
        debug!(peer = %id, room = %room, members = existing.len(), "Joined room");

        // Each side of a new connection learns about the other: existing
        // members see the joiner, the joiner sees every existing member.
        for peer in &existing {
            self.deliver(&peer.id, TransportEvent::PeerCreated(joiner.clone()));
            self.deliver(&peer.id, TransportEvent::ConnectionStateChanged);
            self.deliver(id, TransportEvent::PeerCreated(peer.clone()));
            self.deliver(id, TransportEvent::ConnectionStateChanged);
        }

        Ok(())
    }

    fn detach(&self, id: &PeerId) {
        let neighbors = self.room_peers(id);
        let Some((_, endpoint)) = self.endpoints.remove(id) else {
            return;
        };
        let gone = Peer::new(id.clone(), endpoint.nick);

        debug!(peer = %id, "Endpoint detached");

        for peer in &neighbors {
            self.deliver(&peer.id, TransportEvent::PeerStreamRemoved(gone.clone()));
            self.deliver(&peer.id, TransportEvent::ConnectionStateChanged);
        }
    }

    fn fan_out(&self, from: &PeerId, kind: &str, body: Bytes) -> Result<usize, TransportError> {
        let source = self.peer_record(from).ok_or(TransportError::NotAttached)?;
        if self.room_of(from).is_none() {
            return Err(TransportError::NotAttached);
        }

        let targets = self.room_peers(from);
        for peer in &targets {
            self.deliver(
                &peer.id,
                TransportEvent::DataReceived {
                    kind: kind.to_string(),
                    body: body.clone(),
                    source: source.clone(),
                },
            );
        }

        trace!(peer = %from, kind = %kind, recipients = targets.len(), "Broadcast");
        Ok(targets.len())
    }
}

/// One endpoint's handle onto a [`MeshHub`].
#[derive(Clone)]
pub struct MeshTransport {
    hub: MeshHub,
    id: PeerId,
}

impl MeshTransport {
    /// This endpoint's peer ID.
    #[must_use]
    pub fn peer_id(&self) -> &PeerId {
        &self.id
    }

    /// Leave the mesh, notifying room neighbors that the stream is gone.
    pub fn detach(&self) {
        self.hub.detach(&self.id);
    }
}

#[async_trait]
impl Transport for MeshTransport {
    async fn join_room(&self, room: &str) -> Result<(), TransportError> {
        self.hub.join(&self.id, room)
    }

    async fn broadcast(&self, kind: &str, body: Bytes) -> Result<usize, TransportError> {
        self.hub.fan_out(&self.id, kind, body)
    }

    fn current_peers(&self) -> Vec<Peer> {
        self.hub.room_peers(&self.id)
    }

    fn set_peer_nick(&self, id: &PeerId, nick: &str) -> bool {
        if let Some(mut entry) = self.hub.endpoints.get_mut(id) {
            entry.value_mut().nick = nick.to_string();
            true
        } else {
            false
        }
    }
}
