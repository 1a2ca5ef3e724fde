//! # chatmesh-transport
//!
//! Mesh transport contract for the chatmesh client.
//!
//! The session layer never talks to a network directly; it consumes the
//! [`Transport`] trait plus a stream of [`TransportEvent`]s, and a concrete
//! mesh (WebRTC, in-memory, ...) lives behind that seam. This crate defines
//! the contract and ships [`MeshHub`], an in-process mesh used by the demo
//! binary and the test suite.
//!
//! ```rust,ignore
//! use chatmesh_transport::{MeshHub, Transport, TransportEvent};
//!
//! let hub = MeshHub::new();
//! let (transport, mut events) = hub.attach("Anon1");
//! while let Some(event) = events.recv().await {
//!     // Feed into the session actor
//! }
//! ```

pub mod mesh;
pub mod traits;

pub use mesh::{MeshHub, MeshTransport};
pub use traits::{Peer, PeerId, Transport, TransportError, TransportEvent};
