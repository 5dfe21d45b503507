//! Queue error types

use crate::arena::ArenaError;
use thiserror::Error;

/// Errors raised while building a [`ConcurrentQueue`](super::ConcurrentQueue).
///
/// Operations on a live queue never fail with this type: a full queue hands
/// the rejected item back, an empty one returns `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum QueueError {
    /// The requested capacity is zero or does not fit the node index space
    #[error("invalid queue capacity {capacity}: {message}")]
    InvalidCapacity {
        /// Requested capacity
        capacity: usize,
        /// Why it was rejected
        message: String,
    },

    /// The node arena could not be created
    #[error("queue node storage: {0}")]
    Arena(#[from] ArenaError),
}
