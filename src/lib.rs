//! # Market Data Concurrency Core
//!
//! Building blocks for low-latency market-data pipelines: memory that is
//! recycled without touching the global allocator, a bounded lock-free queue
//! for moving updates between threads, a worker pool that runs work by
//! priority, and a sharded store that keeps one order book per symbol.
//!
//! ## Key Features
//!
//! - **Cache-Line Aware Arena**: [`Arena`] hands out 64-byte aligned blocks from per-category free lists. Allocation and deallocation are a single CAS on a tagged list head; only growth takes a lock.
//!
//! - **Lock-Free MPMC Queue**: [`ConcurrentQueue`] is a bounded Michael–Scott queue whose nodes live in an arena. Producers never block; a full queue hands the item back.
//!
//! - **Priority Worker Pool**: [`WorkerPool`] runs closures on OS threads, highest [`TaskPriority`] first and FIFO within a priority. Every submission returns a [`TaskHandle`] that can be awaited or waited on synchronously. The pool grows under backlog and retires idle workers.
//!
//! - **Sharded Market Data Store**: [`MarketDataStore`] keeps a depth-limited book per subscribed symbol. Each symbol has its own reader/writer lock, so updates for different symbols never contend, and subscriber callbacks run outside the book lock.
//!
//! - **Feed Sources**: named sources own an inbound queue each; [`MarketDataStore::start_sources`] spawns one thread per source to drain it into the store.
//!
//! - **Statistics Everywhere**: every component keeps counters and latency figures that can be read at any time as plain value snapshots. With the `metrics` feature the store also emits counters and histograms through the `metrics` facade.
//!
//! ## Quick Start
//!
//! ```rust
//! use marketcore_rs::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MarketDataStore::new(StoreConfig::default()).unwrap());
//! store.add_source("NASDAQ");
//! store.subscribe("AAPL", Arc::new(|update: &MarketUpdate| {
//!     assert_eq!(update.symbol, "AAPL");
//! }));
//!
//! let runner = store.start_sources().unwrap();
//! store
//!     .publish(MarketUpdate::new("AAPL", "NASDAQ", 150.00, 150.10, 100, 1))
//!     .unwrap();
//! assert_eq!(runner.stop(), 1);
//!
//! let book = store.get_book("AAPL");
//! assert_eq!(book.best_bid(), Some(BookEntry::new(150.00, 100)));
//! ```
//!
//! ## Configuration
//!
//! Every component takes a plain configuration struct from [`config`]. The
//! structs implement `serde` traits, and [`CoreConfig`] bundles all of them so
//! a deployment can be described in one JSON document:
//!
//! ```rust
//! use marketcore_rs::config::CoreConfig;
//!
//! let config = CoreConfig::from_json_str(r#"{ "store": { "max_depth": 5 } }"#).unwrap();
//! assert_eq!(config.store.max_depth, 5);
//! assert_eq!(config.queue.capacity, 1024);
//! ```
//!
//! ## Logging
//!
//! All components log through `tracing`. Call [`setup_logger`] to install a
//! formatted subscriber whose level comes from the `LOGLEVEL` environment
//! variable, or install your own subscriber.
//!
//! ## Concurrency Model
//!
//! | Component | Hot path | Blocking |
//! |-----------|----------|----------|
//! | [`Arena`] | CAS on a tagged free-list head | growth only |
//! | [`ConcurrentQueue`] | CAS on head/tail/next links | never |
//! | [`WorkerPool`] | one mutex around the priority heap | idle workers park |
//! | [`MarketDataStore`] | per-symbol `RwLock` | writers of the same symbol |
//!
//! ## Status
//! This project is in active development.

pub mod arena;
pub mod config;
mod error;
pub mod pool;
pub mod prelude;
pub mod queue;
pub mod store;
mod utils;

pub use arena::{
    AllocationStatsSnapshot, Arena, ArenaError, BlockHandle, CategoryId, OrderCategory,
};
pub use config::{ArenaConfig, ConfigError, CoreConfig, PoolConfig, QueueConfig, StoreConfig};
pub use error::CoreError;
pub use pool::{PoolError, TaskError, TaskHandle, TaskPriority, WorkerPool};
pub use queue::{ConcurrentQueue, QueueError};
pub use store::{
    BookEntry, BookSide, MarketDataCallback, MarketDataStore, MarketUpdate, MetricsSnapshot,
    OrderBook, SourceRunner, StoreError, Subscription,
};
pub use utils::{current_time_millis, current_time_nanos, setup_logger};
