//! Arena error types

use super::category::CategoryId;
use thiserror::Error;

/// Errors that can occur within the [`Arena`](super::Arena)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ArenaError {
    /// The category could not grow its backing storage: the configured
    /// block limit was reached, every segment slot is in use, or the heap
    /// refused the allocation.
    #[error("arena exhausted for category {category}: {reason}")]
    Exhausted {
        /// Category whose free list could not be refilled
        category: CategoryId,
        /// Human readable cause of the failed growth
        reason: String,
    },

    /// The category index is outside the range the arena was built with
    #[error("invalid category {category}: arena has {categories} categories")]
    InvalidCategory {
        /// The requested category
        category: CategoryId,
        /// Number of categories configured for the arena
        categories: usize,
    },

    /// The arena configuration is unusable
    #[error("invalid arena configuration: {message}")]
    InvalidConfig {
        /// Description of the offending setting
        message: String,
    },
}

impl ArenaError {
    /// Returns `true` for capacity failures a caller may retry after backoff.
    #[must_use]
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ArenaError::Exhausted { .. })
    }
}
