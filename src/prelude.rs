/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Prelude module that re-exports commonly used types and traits.
//!
//! Instead of importing each type individually, you can use:
//!
//! ```rust
//! use marketcore_rs::prelude::*;
//! ```
//!
//! This imports everything needed to build a pipeline out of the arena, the
//! queue, the worker pool and the market data store.

// Memory arena
pub use crate::arena::{
    AllocationStatsSnapshot, Arena, ArenaError, BlockHandle, CategoryId, OrderCategory,
};

// Queue
pub use crate::queue::{ConcurrentQueue, QueueError, QueueStatsSnapshot};

// Worker pool
pub use crate::pool::{PoolError, PoolStatsSnapshot, TaskError, TaskHandle, TaskPriority, WorkerPool};

// Market data store
pub use crate::store::{
    BookEntry, BookSide, MarketDataCallback, MarketDataStore, MarketUpdate, MetricsSnapshot,
    OrderBook, SourceRunner, StoreError, Subscription,
};

// Configuration
pub use crate::config::{
    ArenaConfig, ConfigError, CoreConfig, PoolConfig, QueueConfig, StoreConfig,
};

// Errors
pub use crate::error::CoreError;

// Utility functions
pub use crate::utils::{current_time_millis, current_time_nanos, setup_logger};
