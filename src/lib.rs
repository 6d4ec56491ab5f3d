//! converge: the causal synchronization core of a real-time collaborative
//! text editor.
//!
//! Concurrent edits from independent replicas converge without a central
//! coordinator: every operation is tagged with its causal origin (a dot)
//! and a minimal explicit dependency set, and the causal buffer delays
//! application until all dependencies are delivered. Causally independent
//! operations may be applied in any order; the external CRDT merge
//! tolerates that reordering.
//!
//! The CRDT document itself sits behind [`doc::DocumentAdapter`], and the
//! physical transport behind the channel types in [`network`]. This crate
//! only decides *when* an operation is safe to apply, and repairs missing
//! history through state-vector anti-entropy on peer join.

pub mod causal;
pub mod collaborators;
pub mod config;
pub mod doc;
pub mod error;
pub mod network;
pub mod sync;

pub use causal::{CausalBuffer, Clock, Dot, ReplicaId, RichOperation, StateVector};
pub use config::SyncConfig;
pub use error::SyncError;
