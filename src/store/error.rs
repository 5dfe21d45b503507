//! Store error types

use crate::arena::ArenaError;
use thiserror::Error;

/// Errors returned by [`MarketDataStore`](super::MarketDataStore) setup and
/// lifecycle operations. Updates themselves never fail: unknown symbols are
/// counted and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Source threads are already running for this store
    #[error("source threads are already running")]
    AlreadyRunning,

    /// The store configuration is unusable
    #[error("invalid store configuration: {message}")]
    InvalidConfig {
        /// Description of the offending setting
        message: String,
    },

    /// The book-entry arena could not be created
    #[error("book entry storage: {0}")]
    Arena(#[from] ArenaError),

    /// The operating system refused to start a source thread
    #[error("failed to spawn thread for source {source_name}: {message}")]
    SpawnFailed {
        /// Source whose thread could not be started
        source_name: String,
        /// Underlying I/O error message
        message: String,
    },
}
