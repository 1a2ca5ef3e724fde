//! Transport abstraction for the chatmesh session layer.
//!
//! These types define the contract every mesh implementation must provide,
//! keeping the session layer transport-agnostic.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// Opaque handle identifying a peer on the mesh.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(pub String);

impl PeerId {
    /// Create a new peer ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a unique peer ID.
    #[must_use]
    pub fn generate() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::time::{SystemTime, UNIX_EPOCH};

        // Counter keeps IDs unique even within the same nanosecond.
        static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("peer_{:x}_{:x}", timestamp, counter))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A remote participant as the transport currently sees it.
///
/// Peer records are owned by the transport; the session layer queries
/// [`Transport::current_peers`] on demand and never caches the result beyond
/// a single operation, since membership can change between reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Opaque transport handle.
    pub id: PeerId,
    /// Display name last announced by this peer.
    pub nick: String,
}

impl Peer {
    /// Create a new peer record.
    #[must_use]
    pub fn new(id: impl Into<PeerId>, nick: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nick: nick.into(),
        }
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Not attached to any room.
    #[error("Not attached to a room")]
    NotAttached,

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Events the transport delivers to the session layer.
///
/// All events are delivered asynchronously on a single receiver and must be
/// serialized into one handler sequence before touching session state.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A new peer connected to the mesh.
    PeerCreated(Peer),
    /// Some peer's connectivity changed; the session must re-derive the
    /// member count from [`Transport::current_peers`], not trust a delta.
    ConnectionStateChanged,
    /// A peer's data channel was torn down.
    PeerStreamRemoved(Peer),
    /// An inbound broadcast.
    DataReceived {
        /// Application-level kind tag.
        kind: String,
        /// Opaque body bytes.
        body: Bytes,
        /// The peer the broadcast came from.
        source: Peer,
    },
}

/// A handle onto the mesh for one local participant.
///
/// Broadcasts are best-effort: no delivery acknowledgment and no ordering
/// guarantee across peers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Join a named room. Called once the transport signals readiness.
    async fn join_room(&self, room: &str) -> Result<(), TransportError>;

    /// Broadcast a `(kind, body)` datagram to all connected peers.
    ///
    /// Returns the number of peers the datagram was handed to.
    async fn broadcast(&self, kind: &str, body: Bytes) -> Result<usize, TransportError>;

    /// Snapshot of the currently connected peers. May change between calls.
    fn current_peers(&self) -> Vec<Peer>;

    /// Update the stored nick for a peer.
    ///
    /// Peer identity is owned by the transport; the session layer requests
    /// the mutation rather than performing it. Returns `true` if the peer
    /// exists and was updated.
    fn set_peer_nick(&self, id: &PeerId, nick: &str) -> bool;
}
