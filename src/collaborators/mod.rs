//! Collaborator identity tracking.
//!
//! Pseudonym bookkeeping is independent of document causality: updates are
//! idempotent last-writer-wins per peer and are not part of the causal
//! history.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::network::{PeerId, RouterHandle};

/// Subsystem tag under which collaborator messages travel.
pub const COLLABORATORS_TAG: &str = "collaborators";

/// Placeholder pseudonym until a peer announces its own.
pub const DEFAULT_PSEUDONYM: &str = "Anonymous";

/// Pseudonym announcement, unicast to a newly joined peer and broadcast on
/// local pseudonym change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorMessage {
    pub pseudonym: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collaborator {
    pub id: PeerId,
    pub pseudonym: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorEvent {
    Joined(Collaborator),
    Updated(Collaborator),
    Left(PeerId),
}

/// Tracks peer identity and pseudonym. Holds the collaborator entries
/// exclusively; other components only read peer ids for addressing.
pub struct CollaboratorDirectory {
    local_pseudonym: String,
    peers: HashMap<PeerId, Collaborator>,
    router: RouterHandle,
    events: Option<mpsc::UnboundedSender<CollaboratorEvent>>,
}

impl CollaboratorDirectory {
    /// Returns the directory and its event stream.
    pub fn new(
        local_pseudonym: String,
        router: RouterHandle,
    ) -> (Self, mpsc::UnboundedReceiver<CollaboratorEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let directory = Self {
            local_pseudonym,
            peers: HashMap::new(),
            router,
            events: Some(events_tx),
        };
        (directory, events_rx)
    }

    pub fn get(&self, id: PeerId) -> Option<&Collaborator> {
        self.peers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn is_disposed(&self) -> bool {
        self.events.is_none()
    }

    /// Register a joining peer with the placeholder pseudonym and announce
    /// our own pseudonym to it.
    pub fn handle_peer_join(&mut self, id: PeerId) -> Result<(), SyncError> {
        if self.is_disposed() {
            return Err(SyncError::Disposed);
        }
        let collaborator = Collaborator {
            id,
            pseudonym: DEFAULT_PSEUDONYM.to_string(),
        };
        self.peers.insert(id, collaborator.clone());
        self.emit_pseudonym(Some(id))?;
        self.publish(CollaboratorEvent::Joined(collaborator));
        Ok(())
    }

    pub fn handle_peer_leave(&mut self, id: PeerId) {
        if self.is_disposed() {
            return;
        }
        if self.peers.remove(&id).is_some() {
            self.publish(CollaboratorEvent::Left(id));
        }
    }

    /// Decode a routed pseudonym message and update the sender's entry.
    /// Malformed messages are dropped with a warning.
    pub fn handle_message(&mut self, from: PeerId, bytes: &[u8]) {
        if self.is_disposed() {
            return;
        }
        let msg: CollaboratorMessage = match rmp_serde::from_slice(bytes) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(from, error = %e, "dropping malformed collaborator message");
                return;
            }
        };
        let collaborator = Collaborator {
            id: from,
            pseudonym: msg.pseudonym,
        };
        self.peers.insert(from, collaborator.clone());
        self.publish(CollaboratorEvent::Updated(collaborator));
    }

    /// Change the local pseudonym and broadcast it to all peers.
    pub fn set_local_pseudonym(&mut self, pseudonym: String) -> Result<(), SyncError> {
        if self.is_disposed() {
            return Err(SyncError::Disposed);
        }
        self.local_pseudonym = pseudonym;
        self.emit_pseudonym(None)
    }

    /// Idempotent teardown: closes the event stream, ignores further input.
    pub fn dispose(&mut self) {
        if self.events.take().is_some() {
            debug!("collaborator directory disposed");
        }
    }

    fn emit_pseudonym(&self, to: Option<PeerId>) -> Result<(), SyncError> {
        let msg = CollaboratorMessage {
            pseudonym: self.local_pseudonym.clone(),
        };
        let bytes = rmp_serde::to_vec(&msg)?;
        match to {
            Some(peer) => self.router.send_to(COLLABORATORS_TAG, peer, bytes),
            None => self.router.broadcast(COLLABORATORS_TAG, bytes),
        }
        Ok(())
    }

    fn publish(&self, event: CollaboratorEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
