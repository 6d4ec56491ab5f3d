//! Document adapter boundary.
//!
//! The ordered-sequence CRDT itself (identifier allocation, tombstones,
//! merge semantics) is supplied by an external library behind this trait.
//! The sync core only calls apply/generate and reads digests/snapshots.

use anyhow::Result;

/// A local editing intention, translated by the adapter into a CRDT
/// operation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditIntent {
    Insert { index: usize, text: String },
    Delete { index: usize, len: usize },
}

/// One text-level edit derived from applying a remote CRDT operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEdit {
    Insert { index: usize, text: String },
    Delete { index: usize, len: usize },
}

/// Digest and serialized document tree, published after a quiet period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocSnapshot {
    pub digest: u64,
    pub tree: String,
}

/// Interface to the external CRDT document.
///
/// Implementations own the document structure exclusively; one adapter per
/// engine instance.
pub trait DocumentAdapter {
    /// Apply a remote CRDT operation, returning the derived text edits.
    fn apply_remote(&mut self, payload: &[u8]) -> Result<Vec<TextEdit>>;

    /// Apply a local edit to the document and produce the CRDT operation
    /// payload to replicate.
    fn generate_local(&mut self, intent: &EditIntent) -> Result<Vec<u8>>;

    /// Cheap convergence checksum of the current document.
    fn digest(&self) -> u64;

    /// Serialized document tree.
    fn snapshot(&self) -> String;
}
