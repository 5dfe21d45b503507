//! Worker pool error types

use thiserror::Error;

/// Errors returned by [`WorkerPool`](super::WorkerPool) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool is stopping and accepts no new work
    #[error("worker pool is shutting down")]
    ShuttingDown,

    /// The pool configuration is unusable
    #[error("invalid pool configuration: {message}")]
    InvalidConfig {
        /// Description of the offending setting
        message: String,
    },

    /// The operating system refused to start a worker thread
    #[error("failed to spawn worker thread: {message}")]
    SpawnFailed {
        /// Underlying I/O error message
        message: String,
    },
}

/// Why a task produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// The task panicked; carries the panic message
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was never run because the pool shut down first
    #[error("task was cancelled before it ran")]
    Cancelled,
}
