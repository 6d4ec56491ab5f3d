//! CRDT operations tagged with their causal origin.

use serde::{Deserialize, Serialize};

use super::dot::Dot;

/// An opaque CRDT operation together with the causal context needed to
/// decide when it may be applied.
///
/// `dependencies` is the minimal set of foreign dots that must already be
/// delivered first. It never contains dots from `dot.replica`: the implicit
/// same-replica predecessor is always required and not repeated here.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichOperation {
    pub dot: Dot,
    pub dependencies: Vec<Dot>,
    /// Opaque CRDT operation bytes, interpreted only by the document adapter.
    pub payload: Vec<u8>,
}

impl RichOperation {
    pub fn new(dot: Dot, dependencies: Vec<Dot>, payload: Vec<u8>) -> Self {
        debug_assert!(dependencies.iter().all(|d| d.replica != dot.replica));
        Self {
            dot,
            dependencies,
            payload,
        }
    }

    /// An operation with no explicit dependencies.
    pub fn independent(dot: Dot, payload: Vec<u8>) -> Self {
        Self::new(dot, Vec::new(), payload)
    }
}
