//! Sync engine - causally ordered operation exchange
//!
//! Handles:
//! - Local operation emission and remote intake via the causal buffer
//! - Anti-entropy query/reply on peer join
//! - Event-loop orchestration and debounced snapshot publication

pub mod coordinator;
pub mod engine;
pub mod protocol;

pub use coordinator::{CoordinatorCommand, CoordinatorEvents, RemoteEdits, SyncCoordinator};
pub use engine::SyncEngine;
pub use protocol::{SyncMessage, SYNC_TAG};
