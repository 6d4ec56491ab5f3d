//! Tag-based routing between subsystems and the abstract transport.
//!
//! The router is a pure demultiplexer: outbound payloads are wrapped into
//! [`TransportCommand`]s addressed to one peer, all peers, or a random peer;
//! inbound messages are re-exposed per subsystem tag. No retry, no
//! acknowledgment. Delivery order between two `send_to` calls to the same
//! peer is preserved exactly when the transport preserves per-peer FIFO.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::transport::{PeerId, TransportCommand, TransportEvent};

/// A routed inbound message, already stripped of its subsystem tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: PeerId,
    pub payload: Vec<u8>,
}

/// Outbound half of the router. Cheap to clone; each subsystem holds one.
#[derive(Debug, Clone)]
pub struct RouterHandle {
    commands: mpsc::UnboundedSender<TransportCommand>,
}

impl RouterHandle {
    pub fn broadcast(&self, tag: &str, payload: Vec<u8>) {
        let _ = self.commands.send(TransportCommand::Broadcast {
            tag: tag.to_string(),
            payload,
        });
    }

    pub fn send_to(&self, tag: &str, peer: PeerId, payload: Vec<u8>) {
        let _ = self.commands.send(TransportCommand::SendTo {
            peer,
            tag: tag.to_string(),
            payload,
        });
    }

    pub fn send_to_random(&self, tag: &str, payload: Vec<u8>) {
        let _ = self.commands.send(TransportCommand::SendToRandom {
            tag: tag.to_string(),
            payload,
        });
    }
}

/// Demultiplexes transport events to per-tag subscribers and fans out peer
/// join/leave notifications.
pub struct Router {
    commands: mpsc::UnboundedSender<TransportCommand>,
    subscribers: HashMap<String, mpsc::UnboundedSender<InboundMessage>>,
    join_subscribers: Vec<mpsc::UnboundedSender<PeerId>>,
    leave_subscribers: Vec<mpsc::UnboundedSender<PeerId>>,
}

impl Router {
    pub fn new(commands: mpsc::UnboundedSender<TransportCommand>) -> Self {
        Self {
            commands,
            subscribers: HashMap::new(),
            join_subscribers: Vec::new(),
            leave_subscribers: Vec::new(),
        }
    }

    pub fn handle(&self) -> RouterHandle {
        RouterHandle {
            commands: self.commands.clone(),
        }
    }

    /// Receive inbound messages carrying `tag`. One subscriber per tag; a
    /// later subscription replaces the earlier one.
    pub fn subscribe(&mut self, tag: &str) -> mpsc::UnboundedReceiver<InboundMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.insert(tag.to_string(), tx);
        rx
    }

    pub fn subscribe_joins(&mut self) -> mpsc::UnboundedReceiver<PeerId> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.join_subscribers.push(tx);
        rx
    }

    pub fn subscribe_leaves(&mut self) -> mpsc::UnboundedReceiver<PeerId> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.leave_subscribers.push(tx);
        rx
    }

    /// Route one transport event to its subscribers.
    pub fn route(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message { from, tag, payload } => {
                match self.subscribers.get(&tag) {
                    Some(tx) => {
                        if tx.send(InboundMessage { from, payload }).is_err() {
                            debug!(tag, "subscriber gone, dropping routed message");
                            self.subscribers.remove(&tag);
                        }
                    }
                    None => trace!(tag, from, "no subscriber for tag"),
                }
            }
            TransportEvent::PeerJoined(peer) => {
                self.join_subscribers.retain(|tx| tx.send(peer).is_ok());
            }
            TransportEvent::PeerLeft(peer) => {
                self.leave_subscribers.retain(|tx| tx.send(peer).is_ok());
            }
        }
    }

    /// Drive routing from the transport's event stream until it closes.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            self.route(event);
        }
        debug!("transport event stream closed, router stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(from: PeerId, tag: &str, payload: &[u8]) -> TransportEvent {
        TransportEvent::Message {
            from,
            tag: tag.to_string(),
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn test_demux_by_tag() {
        let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
        let mut router = Router::new(cmd_tx);

        let mut sync_rx = router.subscribe("sync");
        let mut collab_rx = router.subscribe("collaborators");

        router.route(message(1, "sync", b"a"));
        router.route(message(2, "collaborators", b"b"));
        router.route(message(3, "unknown", b"c"));

        assert_eq!(
            sync_rx.try_recv().unwrap(),
            InboundMessage {
                from: 1,
                payload: b"a".to_vec()
            }
        );
        assert_eq!(
            collab_rx.try_recv().unwrap(),
            InboundMessage {
                from: 2,
                payload: b"b".to_vec()
            }
        );
        assert!(sync_rx.try_recv().is_err());
        assert!(collab_rx.try_recv().is_err());
    }

    #[test]
    fn test_join_leave_fanout() {
        let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
        let mut router = Router::new(cmd_tx);

        let mut joins_a = router.subscribe_joins();
        let mut joins_b = router.subscribe_joins();
        let mut leaves = router.subscribe_leaves();

        router.route(TransportEvent::PeerJoined(42));
        router.route(TransportEvent::PeerLeft(42));

        assert_eq!(joins_a.try_recv().unwrap(), 42);
        assert_eq!(joins_b.try_recv().unwrap(), 42);
        assert_eq!(leaves.try_recv().unwrap(), 42);
    }

    #[test]
    fn test_outbound_addressing() {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let router = Router::new(cmd_tx);
        let handle = router.handle();

        handle.broadcast("sync", b"x".to_vec());
        handle.send_to("sync", 7, b"y".to_vec());
        handle.send_to_random("sync", b"z".to_vec());

        assert!(matches!(
            cmd_rx.try_recv().unwrap(),
            TransportCommand::Broadcast { .. }
        ));
        assert!(matches!(
            cmd_rx.try_recv().unwrap(),
            TransportCommand::SendTo { peer: 7, .. }
        ));
        assert!(matches!(
            cmd_rx.try_recv().unwrap(),
            TransportCommand::SendToRandom { .. }
        ));
    }
}
