//! Transport boundary types.
//!
//! The physical transport (peer discovery, connection setup, message
//! framing) lives outside this crate. It consumes [`TransportCommand`]s and
//! produces [`TransportEvent`]s over channels. Per-peer FIFO delivery is
//! assumed from the transport, not enforced here; reliability and retry are
//! likewise the transport's responsibility.

use crate::causal::ReplicaId;

/// Transport-level peer identifier. A replica is addressed by its peer id,
/// so the two share an integer space.
pub type PeerId = ReplicaId;

/// Outbound addressing primitives consumed by the external transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Deliver to every connected peer.
    Broadcast { tag: String, payload: Vec<u8> },
    /// Deliver to one peer.
    SendTo {
        peer: PeerId,
        tag: String,
        payload: Vec<u8>,
    },
    /// Deliver to one peer chosen by the transport.
    SendToRandom { tag: String, payload: Vec<u8> },
}

/// Inbound notifications produced by the external transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    PeerJoined(PeerId),
    PeerLeft(PeerId),
    Message {
        from: PeerId,
        tag: String,
        payload: Vec<u8>,
    },
}
