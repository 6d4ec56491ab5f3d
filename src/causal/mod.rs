//! Causal ordering: dots, state vectors, rich operations, and the buffer
//! that decides when an operation is safe to apply.

pub mod buffer;
pub mod dot;
pub mod op;

pub use buffer::CausalBuffer;
pub use dot::{Clock, Dot, ReplicaId, StateVector};
pub use op::RichOperation;
