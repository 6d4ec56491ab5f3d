//! Sync engine — owns the local clock and bridges local edits, remote
//! operations, and the causal buffer.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::causal::{CausalBuffer, Clock, Dot, ReplicaId, RichOperation, StateVector};
use crate::error::SyncError;
use crate::network::{PeerId, RouterHandle};

use super::protocol::{SyncMessage, SYNC_TAG};

/// Per-replica causal intake, emission, and anti-entropy for one document.
///
/// Every delivered operation is retained in memory, indexed by origin
/// replica and clock; that retained history is the only history-recovery
/// source for anti-entropy replay. Disposal is terminal and idempotent:
/// after `dispose()` all input is ignored and the delivered stream closes.
pub struct SyncEngine {
    replica: ReplicaId,
    next_clock: Clock,
    buffer: CausalBuffer,
    /// Delivered operations per origin replica; vector index equals clock.
    history: HashMap<ReplicaId, Vec<RichOperation>>,
    /// Foreign dots delivered since the last local emission. Drained into
    /// the next local operation's explicit dependency set.
    frontier: HashMap<ReplicaId, Clock>,
    router: RouterHandle,
    delivered: Option<mpsc::UnboundedSender<RichOperation>>,
}

impl SyncEngine {
    /// Returns the engine and the stream of causally ordered remote
    /// operations it delivers.
    pub fn new(
        replica: ReplicaId,
        max_pending: usize,
        router: RouterHandle,
    ) -> (Self, mpsc::UnboundedReceiver<RichOperation>) {
        let (delivered_tx, delivered_rx) = mpsc::unbounded_channel();
        let engine = Self {
            replica,
            next_clock: 0,
            buffer: CausalBuffer::new(max_pending),
            history: HashMap::new(),
            frontier: HashMap::new(),
            router,
            delivered: Some(delivered_tx),
        };
        (engine, delivered_rx)
    }

    pub fn replica(&self) -> ReplicaId {
        self.replica
    }

    pub fn vector(&self) -> &StateVector {
        self.buffer.vector()
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.pending_len()
    }

    pub fn is_disposed(&self) -> bool {
        self.delivered.is_none()
    }

    /// Wrap a locally generated CRDT payload into a [`RichOperation`],
    /// apply it to the local causal state, and broadcast it.
    ///
    /// The operation is delivered locally before the broadcast goes out, so
    /// local echo is never required. Dependencies are the frontier of
    /// foreign dots observed since the previous local emission — empty in
    /// the common case.
    pub fn submit_local(&mut self, payload: Vec<u8>) -> Result<RichOperation, SyncError> {
        if self.is_disposed() {
            return Err(SyncError::Disposed);
        }

        let dot = Dot::new(self.replica, self.next_clock);
        let mut dependencies: Vec<Dot> = self
            .frontier
            .drain()
            .map(|(replica, clock)| Dot::new(replica, clock))
            .collect();
        dependencies.sort();

        let op = RichOperation::new(dot, dependencies, payload);
        self.next_clock += 1;

        // A local op is always immediately deliverable to ourselves, and
        // can unlock buffered remote ops that depend on our dot.
        let delivered = self.buffer.offer(op.clone())?;
        self.record_delivered(delivered);

        self.router
            .broadcast(SYNC_TAG, SyncMessage::Operation(op.clone()).encode()?);
        debug!(dot = ?op.dot, deps = op.dependencies.len(), "local operation broadcast");
        Ok(op)
    }

    /// Feed a remote operation through the causal buffer. Everything the
    /// buffer yields is recorded and re-published, in yielded order, on the
    /// delivered stream.
    pub fn receive_remote(&mut self, op: RichOperation) -> Result<(), SyncError> {
        if self.is_disposed() {
            return Err(SyncError::Disposed);
        }
        let delivered = self.buffer.offer(op)?;
        self.record_delivered(delivered);
        Ok(())
    }

    /// Decode and dispatch one routed sync message.
    pub fn handle_message(&mut self, from: PeerId, bytes: &[u8]) -> Result<(), SyncError> {
        if self.is_disposed() {
            return Err(SyncError::Disposed);
        }
        match SyncMessage::decode(bytes)? {
            SyncMessage::Operation(op) => self.receive_remote(op),
            SyncMessage::QuerySync { vector } => self.handle_query_sync(from, &vector),
            SyncMessage::ReplySync { ops } => {
                self.handle_reply_sync(ops);
                Ok(())
            }
        }
    }

    /// Start anti-entropy with a newly joined peer by sending it our state
    /// vector.
    pub fn handle_peer_join(&mut self, peer: PeerId) -> Result<(), SyncError> {
        if self.is_disposed() {
            return Err(SyncError::Disposed);
        }
        let query = SyncMessage::QuerySync {
            vector: self.buffer.vector().clone(),
        };
        self.router.send_to(SYNC_TAG, peer, query.encode()?);
        debug!(peer, "sent anti-entropy query");
        Ok(())
    }

    /// Replay, unicast to `peer`, every retained operation the peer's
    /// vector does not cover.
    pub fn handle_query_sync(
        &mut self,
        peer: PeerId,
        vector: &StateVector,
    ) -> Result<(), SyncError> {
        let mut ops = Vec::new();
        let mut replicas: Vec<ReplicaId> = self.history.keys().copied().collect();
        replicas.sort_unstable();

        for replica in replicas {
            let log = &self.history[&replica];
            let from = vector.next_expected(replica) as usize;
            ops.extend(log.iter().skip(from).cloned());
        }

        if ops.is_empty() {
            return Ok(());
        }
        debug!(peer, count = ops.len(), "replaying history for joining peer");
        let reply = SyncMessage::ReplySync { ops };
        self.router.send_to(SYNC_TAG, peer, reply.encode()?);
        Ok(())
    }

    /// Apply an anti-entropy reply. Each operation is offered independently
    /// so one rejected operation does not abort the rest of the replay.
    pub fn handle_reply_sync(&mut self, ops: Vec<RichOperation>) {
        for op in ops {
            let dot = op.dot;
            if let Err(e) = self.receive_remote(op) {
                warn!(?dot, error = %e, "dropping replayed operation");
            }
        }
    }

    /// Terminal, idempotent teardown: closes the delivered stream and makes
    /// every further call a no-op.
    pub fn dispose(&mut self) {
        if self.delivered.take().is_some() {
            debug!(replica = self.replica, "sync engine disposed");
        }
    }

    fn record_delivered(&mut self, ops: Vec<RichOperation>) {
        for op in ops {
            debug_assert_eq!(
                self.history.get(&op.dot.replica).map_or(0, Vec::len) as Clock,
                op.dot.clock
            );
            self.history
                .entry(op.dot.replica)
                .or_default()
                .push(op.clone());

            if op.dot.replica != self.replica {
                self.frontier
                    .entry(op.dot.replica)
                    .and_modify(|c| *c = (*c).max(op.dot.clock))
                    .or_insert(op.dot.clock);
                if let Some(tx) = &self.delivered {
                    let _ = tx.send(op);
                }
            }
        }
    }
}
