//! Coordinator — drives one replica's event loop.
//!
//! All handlers (local edits, routed messages, join/leave, teardown) run
//! sequentially inside one `select!` loop, so the causal buffer and state
//! vector need no locking. Teardown is processed as a normal event: a
//! cascade already in progress completes before disposal takes effect.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::causal::{ReplicaId, RichOperation};
use crate::collaborators::{CollaboratorDirectory, CollaboratorEvent, COLLABORATORS_TAG};
use crate::config::SyncConfig;
use crate::doc::{DocSnapshot, DocumentAdapter, EditIntent, TextEdit};
use crate::network::{InboundMessage, PeerId, Router};

use super::engine::SyncEngine;
use super::protocol::SYNC_TAG;

/// Inputs accepted by a running coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorCommand {
    /// A local editing intention from the editor.
    LocalEdit(EditIntent),
    /// Change the local pseudonym and announce it.
    SetPseudonym(String),
    /// Terminal teardown.
    Dispose,
}

/// Text edits derived from one delivered remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEdits {
    pub author: ReplicaId,
    pub edits: Vec<TextEdit>,
}

/// Streams published by a running coordinator.
pub struct CoordinatorEvents {
    pub remote_edits: mpsc::UnboundedReceiver<RemoteEdits>,
    pub snapshots: mpsc::UnboundedReceiver<DocSnapshot>,
    pub collaborators: mpsc::UnboundedReceiver<CollaboratorEvent>,
}

/// Wires the sync engine, collaborator directory, and document adapter to
/// the router's streams and runs them on one logical event loop.
pub struct SyncCoordinator<D: DocumentAdapter> {
    engine: SyncEngine,
    directory: CollaboratorDirectory,
    doc: D,
    quiesce_period: Duration,

    delivered_rx: mpsc::UnboundedReceiver<RichOperation>,
    sync_rx: mpsc::UnboundedReceiver<InboundMessage>,
    collab_rx: mpsc::UnboundedReceiver<InboundMessage>,
    joins: mpsc::UnboundedReceiver<PeerId>,
    leaves: mpsc::UnboundedReceiver<PeerId>,

    remote_edits_tx: mpsc::UnboundedSender<RemoteEdits>,
    snapshots_tx: mpsc::UnboundedSender<DocSnapshot>,
}

impl<D: DocumentAdapter> SyncCoordinator<D> {
    pub fn new(
        replica: ReplicaId,
        config: &SyncConfig,
        doc: D,
        router: &mut Router,
    ) -> (Self, CoordinatorEvents) {
        let (engine, delivered_rx) = SyncEngine::new(replica, config.max_pending, router.handle());
        let (directory, collaborators) =
            CollaboratorDirectory::new(config.pseudonym.clone(), router.handle());

        let (remote_edits_tx, remote_edits) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots) = mpsc::unbounded_channel();

        let coordinator = Self {
            engine,
            directory,
            doc,
            quiesce_period: Duration::from_millis(config.snapshot_quiesce_ms),
            delivered_rx,
            sync_rx: router.subscribe(SYNC_TAG),
            collab_rx: router.subscribe(COLLABORATORS_TAG),
            joins: router.subscribe_joins(),
            leaves: router.subscribe_leaves(),
            remote_edits_tx,
            snapshots_tx,
        };
        let events = CoordinatorEvents {
            remote_edits,
            snapshots,
            collaborators,
        };
        (coordinator, events)
    }

    /// Run until a `Dispose` command arrives or the command stream closes.
    ///
    /// A quiet period after the last delivery triggers one digest/snapshot
    /// emission per burst of edits.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<CoordinatorCommand>) {
        let quiesce = sleep(self.quiesce_period);
        tokio::pin!(quiesce);
        let mut dirty = false;

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(CoordinatorCommand::LocalEdit(intent)) => {
                        match self.doc.generate_local(&intent) {
                            Ok(payload) => match self.engine.submit_local(payload) {
                                Ok(_) => {
                                    dirty = true;
                                    quiesce.as_mut().reset(Instant::now() + self.quiesce_period);
                                }
                                Err(e) => warn!(error = %e, "dropping local edit"),
                            },
                            Err(e) => warn!(error = %e, "document adapter rejected local edit"),
                        }
                    }
                    Some(CoordinatorCommand::SetPseudonym(pseudonym)) => {
                        if let Err(e) = self.directory.set_local_pseudonym(pseudonym) {
                            warn!(error = %e, "pseudonym change ignored");
                        }
                    }
                    Some(CoordinatorCommand::Dispose) | None => break,
                },

                Some(msg) = self.sync_rx.recv() => {
                    if let Err(e) = self.engine.handle_message(msg.from, &msg.payload) {
                        warn!(from = msg.from, error = %e, "dropping sync message");
                    }
                }

                Some(op) = self.delivered_rx.recv() => {
                    match self.doc.apply_remote(&op.payload) {
                        Ok(edits) => {
                            let _ = self.remote_edits_tx.send(RemoteEdits {
                                author: op.dot.replica,
                                edits,
                            });
                            dirty = true;
                            quiesce.as_mut().reset(Instant::now() + self.quiesce_period);
                        }
                        Err(e) => {
                            warn!(dot = ?op.dot, error = %e, "document adapter rejected operation");
                        }
                    }
                }

                Some(msg) = self.collab_rx.recv() => {
                    self.directory.handle_message(msg.from, &msg.payload);
                }

                Some(peer) = self.joins.recv() => {
                    if let Err(e) = self.directory.handle_peer_join(peer) {
                        warn!(peer, error = %e, "peer join ignored");
                    }
                    if let Err(e) = self.engine.handle_peer_join(peer) {
                        warn!(peer, error = %e, "anti-entropy query not sent");
                    }
                }

                Some(peer) = self.leaves.recv() => {
                    self.directory.handle_peer_leave(peer);
                }

                () = &mut quiesce, if dirty => {
                    dirty = false;
                    let _ = self.snapshots_tx.send(DocSnapshot {
                        digest: self.doc.digest(),
                        tree: self.doc.snapshot(),
                    });
                }

                else => break,
            }
        }

        self.engine.dispose();
        self.directory.dispose();
        info!(replica = self.engine.replica(), "coordinator stopped");
    }
}
