//! Causal bookkeeping primitives: dots and state vectors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identifier of one replica. Replicas are addressed by their transport
/// peer id, so the two share an integer space.
pub type ReplicaId = u64;

/// Per-replica operation sequence number, starting at 0.
pub type Clock = u64;

/// Identifies one operation: its origin replica and per-replica sequence
/// number. Clocks are assigned by the owning replica only; no two operations
/// from the same replica ever share a clock value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dot {
    pub replica: ReplicaId,
    pub clock: Clock,
}

impl Dot {
    pub fn new(replica: ReplicaId, clock: Clock) -> Self {
        Self { replica, clock }
    }

    /// The implicit same-replica predecessor, or `None` for a replica's
    /// first operation.
    pub fn predecessor(&self) -> Option<Dot> {
        self.clock
            .checked_sub(1)
            .map(|clock| Dot::new(self.replica, clock))
    }
}

/// Mapping from replica to the highest contiguously delivered clock.
///
/// No entry for a replica means nothing from it has been delivered yet.
/// If an entry reads `c`, every operation from that replica with clock
/// `0..=c` has been delivered; gaps are never represented. Mutated only by
/// the delivery step, one increment per delivered operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateVector {
    entries: HashMap<ReplicaId, Clock>,
}

impl StateVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest delivered clock for a replica, if any operation from it has
    /// been delivered.
    pub fn get(&self, replica: ReplicaId) -> Option<Clock> {
        self.entries.get(&replica).copied()
    }

    /// The clock the next deliverable operation from `replica` must carry.
    pub fn next_expected(&self, replica: ReplicaId) -> Clock {
        self.entries.get(&replica).map_or(0, |c| c + 1)
    }

    /// Whether the operation identified by `dot` has already been delivered.
    pub fn covers(&self, dot: &Dot) -> bool {
        self.entries
            .get(&dot.replica)
            .is_some_and(|c| *c >= dot.clock)
    }

    /// Record the delivery of `dot`. Delivery is strictly in per-replica
    /// clock order, so `dot.clock` must be the next expected clock.
    pub fn advance(&mut self, dot: Dot) {
        debug_assert_eq!(dot.clock, self.next_expected(dot.replica));
        self.entries.insert(dot.replica, dot.clock);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReplicaId, Clock)> + '_ {
        self.entries.iter().map(|(r, c)| (*r, *c))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_vector_expects_clock_zero() {
        let vector = StateVector::new();
        assert_eq!(vector.next_expected(7), 0);
        assert!(!vector.covers(&Dot::new(7, 0)));
    }

    #[test]
    fn test_advance_tracks_highest_contiguous_clock() {
        let mut vector = StateVector::new();
        vector.advance(Dot::new(3, 0));
        vector.advance(Dot::new(3, 1));

        assert_eq!(vector.get(3), Some(1));
        assert_eq!(vector.next_expected(3), 2);
        assert!(vector.covers(&Dot::new(3, 0)));
        assert!(vector.covers(&Dot::new(3, 1)));
        assert!(!vector.covers(&Dot::new(3, 2)));
    }

    #[test]
    fn test_predecessor() {
        assert_eq!(Dot::new(1, 5).predecessor(), Some(Dot::new(1, 4)));
        assert_eq!(Dot::new(1, 0).predecessor(), None);
    }
}
