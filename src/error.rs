//! Error taxonomy for the sync core.
//!
//! Nothing here is fatal to the process: every failure degrades to "this
//! operation never gets applied" rather than corrupting causal state.

use thiserror::Error;

use crate::causal::Dot;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A wire message failed to decode. The message is dropped without any
    /// effect on the state vector.
    #[error("malformed message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A wire message failed to encode.
    #[error("encoding message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Admitting an undeliverable operation would exceed the configured
    /// pending-buffer bound. The operation is rejected; a later anti-entropy
    /// exchange can recover it.
    #[error("pending buffer at capacity ({pending} operations), rejecting {dot:?}")]
    PendingLimit { dot: Dot, pending: usize },

    /// Input arrived after `dispose()`. Disposal is terminal.
    #[error("engine disposed")]
    Disposed,
}
