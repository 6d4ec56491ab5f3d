//! Deliverability decisions and causally ordered delivery.

use tracing::{debug, trace};

use super::dot::{Dot, StateVector};
use super::op::RichOperation;
use crate::error::SyncError;

/// Holds not-yet-deliverable operations and the current state vector, and
/// cascades delivery once dependencies are satisfied.
///
/// Invariant: every buffered operation has at least one unsatisfied
/// dependency (its same-replica predecessor is not yet at the vector, or an
/// explicit foreign dependency is not yet covered). Buffered operations are
/// removed only by delivery, or rejected up front by the pending bound.
#[derive(Debug)]
pub struct CausalBuffer {
    vector: StateVector,
    pending: Vec<RichOperation>,
    max_pending: usize,
}

impl CausalBuffer {
    pub fn new(max_pending: usize) -> Self {
        Self {
            vector: StateVector::new(),
            pending: Vec::new(),
            max_pending,
        }
    }

    /// Whether `op` can be applied right now: its same-replica predecessor
    /// is the latest delivered clock for its replica, and every explicit
    /// dependency is covered. Duplicates (clock already covered) are not
    /// deliverable.
    pub fn is_deliverable(&self, op: &RichOperation) -> bool {
        op.dot.clock == self.vector.next_expected(op.dot.replica)
            && op.dependencies.iter().all(|d| self.vector.covers(d))
    }

    /// Insert an operation and return everything that becomes deliverable,
    /// in delivery order.
    ///
    /// A duplicate (dot already covered, or already buffered) is discarded
    /// as a no-op. An undeliverable operation is buffered and yields
    /// nothing. A deliverable operation is delivered immediately, followed
    /// by a cascade: the pending set is re-scanned for newly satisfied
    /// operations until a full pass delivers nothing. Simultaneously
    /// satisfied operations are delivered in ascending `(replica, clock)`
    /// order so that delivery order is deterministic across replicas.
    pub fn offer(&mut self, op: RichOperation) -> Result<Vec<RichOperation>, SyncError> {
        if self.vector.covers(&op.dot) || self.pending.iter().any(|p| p.dot == op.dot) {
            trace!(dot = ?op.dot, "duplicate operation discarded");
            return Ok(Vec::new());
        }

        if !self.is_deliverable(&op) {
            if self.pending.len() >= self.max_pending {
                return Err(SyncError::PendingLimit {
                    dot: op.dot,
                    pending: self.pending.len(),
                });
            }
            debug!(dot = ?op.dot, pending = self.pending.len() + 1, "operation buffered");
            self.pending.push(op);
            return Ok(Vec::new());
        }

        let mut delivered = Vec::new();
        self.deliver(op, &mut delivered);

        // Cascade to fixpoint, always picking the smallest satisfied dot.
        loop {
            let mut next: Option<usize> = None;
            for (i, candidate) in self.pending.iter().enumerate() {
                if self.is_deliverable(candidate)
                    && next.map_or(true, |n| candidate.dot < self.pending[n].dot)
                {
                    next = Some(i);
                }
            }
            match next {
                Some(i) => {
                    let op = self.pending.swap_remove(i);
                    self.deliver(op, &mut delivered);
                }
                None => break,
            }
        }

        Ok(delivered)
    }

    fn deliver(&mut self, op: RichOperation, delivered: &mut Vec<RichOperation>) {
        self.vector.advance(op.dot);
        // A delivery can turn a buffered op into a duplicate of itself.
        self.pending.retain(|p| !self.vector.covers(&p.dot));
        delivered.push(op);
    }

    pub fn vector(&self) -> &StateVector {
        &self.vector
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(replica: u64, clock: u64) -> RichOperation {
        RichOperation::independent(Dot::new(replica, clock), vec![replica as u8, clock as u8])
    }

    fn op_with_deps(replica: u64, clock: u64, deps: &[(u64, u64)]) -> RichOperation {
        let deps = deps.iter().map(|&(r, c)| Dot::new(r, c)).collect();
        RichOperation::new(Dot::new(replica, clock), deps, vec![replica as u8, clock as u8])
    }

    fn dots(ops: &[RichOperation]) -> Vec<Dot> {
        ops.iter().map(|o| o.dot).collect()
    }

    #[test]
    fn test_sequential_delivery_after_reorder() {
        // Ops 0..=2 from replica 0, op2 depending on (0,1), arriving as
        // [op1, op2, op0].
        let mut buffer = CausalBuffer::new(64);

        assert!(buffer.offer(op(0, 1)).unwrap().is_empty());
        assert!(buffer
            .offer(op_with_deps(0, 2, &[]))
            .unwrap()
            .is_empty());

        let delivered = buffer.offer(op(0, 0)).unwrap();
        assert_eq!(
            dots(&delivered),
            vec![Dot::new(0, 0), Dot::new(0, 1), Dot::new(0, 2)]
        );
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn test_foreign_dependency_holds_delivery() {
        // B from replica 2 depends on (0,0); B arrives first.
        let mut buffer = CausalBuffer::new(64);

        let b = op_with_deps(2, 0, &[(0, 0)]);
        assert!(buffer.offer(b).unwrap().is_empty());
        assert_eq!(buffer.pending_len(), 1);

        let delivered = buffer.offer(op(0, 0)).unwrap();
        assert_eq!(dots(&delivered), vec![Dot::new(0, 0), Dot::new(2, 0)]);
    }

    #[test]
    fn test_duplicate_is_discarded() {
        let mut buffer = CausalBuffer::new(64);
        assert_eq!(buffer.offer(op(1, 0)).unwrap().len(), 1);
        let before = buffer.vector().clone();

        assert!(buffer.offer(op(1, 0)).unwrap().is_empty());
        assert_eq!(buffer.vector(), &before);
    }

    #[test]
    fn test_duplicate_of_buffered_op_is_discarded() {
        let mut buffer = CausalBuffer::new(64);
        assert!(buffer.offer(op(1, 1)).unwrap().is_empty());
        assert!(buffer.offer(op(1, 1)).unwrap().is_empty());
        assert_eq!(buffer.pending_len(), 1);

        let delivered = buffer.offer(op(1, 0)).unwrap();
        assert_eq!(delivered.len(), 2);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn test_cascade_tie_break_is_ascending() {
        // Two ops from different replicas both waiting on (0,0). They must
        // come out ascending by (replica, clock) regardless of arrival order.
        let mut buffer = CausalBuffer::new(64);
        assert!(buffer.offer(op_with_deps(5, 0, &[(0, 0)])).unwrap().is_empty());
        assert!(buffer.offer(op_with_deps(3, 0, &[(0, 0)])).unwrap().is_empty());

        let delivered = buffer.offer(op(0, 0)).unwrap();
        assert_eq!(
            dots(&delivered),
            vec![Dot::new(0, 0), Dot::new(3, 0), Dot::new(5, 0)]
        );
    }

    #[test]
    fn test_chained_cascade_completes_in_one_offer() {
        // (1,0) <- (2,0) <- (3,0): each waits on the previous replica's op.
        let mut buffer = CausalBuffer::new(64);
        assert!(buffer.offer(op_with_deps(3, 0, &[(2, 0)])).unwrap().is_empty());
        assert!(buffer.offer(op_with_deps(2, 0, &[(1, 0)])).unwrap().is_empty());

        let delivered = buffer.offer(op(1, 0)).unwrap();
        assert_eq!(
            dots(&delivered),
            vec![Dot::new(1, 0), Dot::new(2, 0), Dot::new(3, 0)]
        );
    }

    #[test]
    fn test_pending_bound_is_surfaced() {
        let mut buffer = CausalBuffer::new(2);
        assert!(buffer.offer(op(1, 5)).unwrap().is_empty());
        assert!(buffer.offer(op(2, 5)).unwrap().is_empty());

        let err = buffer.offer(op(3, 5)).unwrap_err();
        assert!(matches!(err, SyncError::PendingLimit { pending: 2, .. }));
        // The bound rejects without touching delivered state.
        assert!(buffer.vector().is_empty());
        assert_eq!(buffer.pending_len(), 2);
    }

    #[test]
    fn test_unsatisfiable_dependency_stays_buffered() {
        let mut buffer = CausalBuffer::new(64);
        assert!(buffer.offer(op_with_deps(2, 0, &[(9, 9)])).unwrap().is_empty());

        // Unrelated deliveries do not free it.
        assert_eq!(buffer.offer(op(1, 0)).unwrap().len(), 1);
        assert_eq!(buffer.pending_len(), 1);
    }
}
