//! Crate-wide error type

use crate::arena::ArenaError;
use crate::config::ConfigError;
use crate::pool::{PoolError, TaskError};
use crate::queue::QueueError;
use crate::store::StoreError;
use thiserror::Error;

/// Any error produced by the components of this crate.
///
/// Each component returns its own error type; `CoreError` lets applications
/// that wire several components together propagate all of them with `?`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Block arena failure
    #[error(transparent)]
    Arena(ArenaError),

    /// Queue construction failure
    #[error(transparent)]
    Queue(QueueError),

    /// Worker pool failure
    #[error(transparent)]
    Pool(PoolError),

    /// A submitted task did not produce a result
    #[error(transparent)]
    Task(TaskError),

    /// Market data store failure
    #[error(transparent)]
    Store(StoreError),

    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(ConfigError),
}

impl From<ArenaError> for CoreError {
    #[cold]
    fn from(err: ArenaError) -> Self {
        CoreError::Arena(err)
    }
}

impl From<QueueError> for CoreError {
    #[cold]
    fn from(err: QueueError) -> Self {
        CoreError::Queue(err)
    }
}

impl From<PoolError> for CoreError {
    #[cold]
    fn from(err: PoolError) -> Self {
        CoreError::Pool(err)
    }
}

impl From<TaskError> for CoreError {
    #[cold]
    fn from(err: TaskError) -> Self {
        CoreError::Task(err)
    }
}

impl From<StoreError> for CoreError {
    #[cold]
    fn from(err: StoreError) -> Self {
        CoreError::Store(err)
    }
}

impl From<ConfigError> for CoreError {
    #[cold]
    fn from(err: ConfigError) -> Self {
        CoreError::Config(err)
    }
}
