//! Engine configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Quiet period before publishing a document digest/snapshot, in
    /// milliseconds. Each delivery resets the timer, coalescing a burst of
    /// edits into one snapshot emission.
    #[serde(default = "default_quiesce_ms")]
    pub snapshot_quiesce_ms: u64,

    /// Upper bound on buffered not-yet-deliverable operations.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    /// Pseudonym announced to newly joined peers.
    #[serde(default = "default_pseudonym")]
    pub pseudonym: String,
}

fn default_quiesce_ms() -> u64 { 1000 }
fn default_max_pending() -> usize { 4096 }
fn default_pseudonym() -> String { "Anonymous".to_string() }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            snapshot_quiesce_ms: default_quiesce_ms(),
            max_pending: default_max_pending(),
            pseudonym: default_pseudonym(),
        }
    }
}
