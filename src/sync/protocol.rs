//! Sync wire protocol

use serde::{Deserialize, Serialize};

use crate::causal::{RichOperation, StateVector};
use crate::error::SyncError;

/// Subsystem tag under which sync messages travel.
pub const SYNC_TAG: &str = "sync";

/// Messages in the sync protocol, MessagePack-encoded inside a tag-addressed
/// transport frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// A single operation, broadcast as it is produced.
    Operation(RichOperation),

    /// Anti-entropy query: the sender's state vector, sent on join to
    /// request missing history.
    QuerySync { vector: StateVector },

    /// Anti-entropy reply: operations covering the gap identified from a
    /// received vector, in per-replica clock order.
    ReplySync { ops: Vec<RichOperation> },
}

impl SyncMessage {
    pub fn encode(&self) -> Result<Vec<u8>, SyncError> {
        Ok(rmp_serde::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::causal::Dot;

    #[test]
    fn test_operation_roundtrip() {
        let msg = SyncMessage::Operation(RichOperation::new(
            Dot::new(1, 4),
            vec![Dot::new(0, 2)],
            vec![0xde, 0xad],
        ));
        let decoded = SyncMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_query_sync_roundtrip() {
        let mut vector = StateVector::new();
        vector.advance(Dot::new(0, 0));
        vector.advance(Dot::new(0, 1));
        let msg = SyncMessage::QuerySync { vector };
        let decoded = SyncMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(matches!(
            SyncMessage::decode(b"\xc1not-a-message"),
            Err(SyncError::Decode(_))
        ));
    }
}
