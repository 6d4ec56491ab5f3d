//! Message routing over the abstract transport.

pub mod router;
pub mod transport;

pub use router::{InboundMessage, Router, RouterHandle};
pub use transport::{PeerId, TransportCommand, TransportEvent};
