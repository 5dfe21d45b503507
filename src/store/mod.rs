//! Sharded order-book store fed by concurrent update sources.
//!
//! Every symbol has its own shard with a reader/writer lock around the book
//! and a separate lock around the subscriber list, so updates for different
//! symbols never contend. Processing an update follows a fixed sequence:
//!
//! 1. read section: is the symbol subscribed?
//! 2. write section: check again, then apply the levels
//! 3. release the write lock and invoke the subscribers
//!
//! Book levels are [`BookEntry`] blocks from an [`Arena`] with one free list per
//! [`BookSide`].
//!
//! ```rust
//! use marketcore_rs::config::StoreConfig;
//! use marketcore_rs::store::{MarketDataStore, MarketUpdate};
//! use std::sync::Arc;
//!
//! let store = MarketDataStore::new(StoreConfig::default()).unwrap();
//! assert!(store.subscribe("AAPL", Arc::new(|_update| {})));
//! store.process_update(&MarketUpdate::new("AAPL", "NASDAQ", 150.00, 150.10, 100, 1));
//!
//! let book = store.get_book("AAPL");
//! assert_eq!(book.best_bid().unwrap().price, 150.00);
//! assert_eq!(book.best_ask().unwrap().price, 150.10);
//! ```

mod book;
mod error;
mod metrics;
mod shard;
mod source;
mod subscription;

pub use book::{BookEntry, BookSide, MarketUpdate, OrderBook};
pub use error::StoreError;
pub use metrics::MetricsSnapshot;
pub use shard::MarketDataCallback;
pub use source::SourceRunner;
pub use subscription::Subscription;

use crate::arena::{AllocationStatsSnapshot, Arena};
use crate::config::{QueueConfig, StoreConfig};
use crate::queue::ConcurrentQueue;
use crate::utils::panic_message;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::StoreMetrics;
use shard::{Subscriber, SymbolShard};
use source::{SourceFeed, run_source};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{error, info, trace, warn};

/// Concurrent store of per-symbol order books.
///
/// Shared between threads as `Arc<MarketDataStore>`; every method takes `&self`.
pub struct MarketDataStore {
    config: StoreConfig,
    shards: DashMap<String, Arc<SymbolShard>>,
    symbol_count: AtomicUsize,
    entries: Arc<Arena<BookEntry>>,
    sources: DashMap<String, Arc<SourceFeed>>,
    next_subscriber: AtomicU64,
    metrics: StoreMetrics,
    pub(crate) running: AtomicBool,
}

impl std::fmt::Debug for MarketDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataStore")
            .field("symbols", &self.shards.len())
            .field("sources", &self.sources.len())
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

impl MarketDataStore {
    /// Creates an empty store.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate().map_err(|e| StoreError::InvalidConfig {
            message: e.to_string(),
        })?;
        let entries = Arena::new(BookSide::COUNT, config.entry_arena.clone())?;
        info!(
            max_symbols = config.max_symbols,
            max_depth = config.max_depth,
            "market data store created"
        );
        Ok(Self {
            metrics: StoreMetrics::new(config.contention_threshold(), config.latency_ema_alpha),
            config,
            shards: DashMap::new(),
            symbol_count: AtomicUsize::new(0),
            entries: Arc::new(entries),
            sources: DashMap::new(),
            next_subscriber: AtomicU64::new(1),
            running: AtomicBool::new(false),
        })
    }

    /// Registers an update source with its own inbound queue. Returns `false`
    /// if a source with that name already exists.
    ///
    /// Sources added while source threads run are served from the next
    /// [`start_sources`](Self::start_sources).
    pub fn add_source(&self, name: &str) -> bool {
        match self.sources.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                let queue_config = QueueConfig::with_capacity(self.config.source_queue_capacity);
                let queue = match ConcurrentQueue::with_config(queue_config) {
                    Ok(queue) => queue,
                    Err(err) => {
                        error!(source = name, error = %err, "failed to create source queue");
                        return false;
                    }
                };
                vacant.insert(Arc::new(SourceFeed {
                    name: name.to_string(),
                    queue,
                }));
                self.metrics.register_source(name);
                info!(source = name, "source registered");
                true
            }
        }
    }

    /// Registers `callback` for `symbol`, creating and activating its book.
    /// Returns `false` when `symbol` is new and `max_symbols` books already exist.
    pub fn subscribe(&self, symbol: &str, callback: MarketDataCallback) -> bool {
        self.register(symbol, callback).is_some()
    }

    /// Like [`subscribe`](Self::subscribe), but returns a guard that
    /// deregisters the callback when dropped.
    pub fn subscribe_scoped(
        &self,
        symbol: &str,
        callback: MarketDataCallback,
    ) -> Option<Subscription> {
        let (shard, id) = self.register(symbol, callback)?;
        Some(Subscription::new(id, &shard, &self.entries))
    }

    /// Removes every callback of `symbol` and clears its book. Later updates
    /// for the symbol are dropped. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, symbol: &str) -> bool {
        let Some(shard) = self.shard(symbol) else {
            return false;
        };
        let was_active = shard.deactivate(&self.entries);
        if was_active {
            info!(symbol, "unsubscribed");
        }
        was_active
    }

    /// Applies `update` to its symbol's book and notifies the subscribers.
    ///
    /// Updates for unknown or unsubscribed symbols are counted as dropped.
    pub fn process_update(&self, update: &MarketUpdate) {
        let start = Instant::now();
        let Some(shard) = self.shard(&update.symbol) else {
            self.drop_update(update);
            return;
        };

        if !shard.book.read().active {
            self.drop_update(update);
            return;
        }

        let failures = {
            let mut book = shard.book.write();
            // The symbol may have been unsubscribed between the two sections.
            if !book.active {
                drop(book);
                self.drop_update(update);
                return;
            }
            book.apply(update, &self.entries, self.config.max_depth)
        };
        if failures > 0 {
            warn!(symbol = %update.symbol, failures, "book entry arena exhausted, levels skipped");
            for _ in 0..failures {
                self.metrics.record_allocation_failure();
            }
        }

        for subscriber in shard.subscribers().iter() {
            let callback = &subscriber.callback;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(update))) {
                self.metrics.record_callback_failure();
                error!(
                    symbol = %update.symbol,
                    subscriber = subscriber.id,
                    panic = %panic_message(payload.as_ref()),
                    "market data callback panicked"
                );
            }
        }

        self.metrics.record_processed(&update.source, start.elapsed());
    }

    /// Routes `update` to the inbound queue of its source. Hands the update
    /// back if the source is unknown or its queue is full.
    pub fn publish(&self, update: MarketUpdate) -> Result<(), MarketUpdate> {
        let Some(feed) = self
            .sources
            .get(&update.source)
            .map(|feed| Arc::clone(feed.value()))
        else {
            trace!(source = %update.source, "publish to unknown source");
            return Err(update);
        };
        feed.queue.enqueue(update)
    }

    /// Starts one thread per registered source, each draining its queue into
    /// [`process_update`](Self::process_update).
    pub fn start_sources(self: &Arc<Self>) -> Result<SourceRunner, StoreError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StoreError::AlreadyRunning);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let mut runner = SourceRunner::new(Arc::clone(self), Arc::clone(&stop));
        let feeds: Vec<Arc<SourceFeed>> = self
            .sources
            .iter()
            .map(|feed| Arc::clone(feed.value()))
            .collect();

        for feed in feeds {
            let name = feed.name.clone();
            let store = Arc::clone(self);
            let stop = Arc::clone(&stop);
            let poll_interval = self.config.source_poll_interval();
            let spawned = std::thread::Builder::new()
                .name(format!("source-{name}"))
                .spawn(move || run_source(store, feed, stop, poll_interval));
            match spawned {
                Ok(handle) => runner.push(name, handle),
                Err(err) => {
                    error!(source = %name, error = %err, "failed to start source thread");
                    // Dropping the runner stops the threads started so far.
                    drop(runner);
                    return Err(StoreError::SpawnFailed {
                        source_name: name,
                        message: err.to_string(),
                    });
                }
            }
        }
        info!(sources = runner.sources().len(), "source threads started");
        Ok(runner)
    }

    /// Owned copy of `symbol`'s book; empty if the symbol is unknown.
    pub fn get_book(&self, symbol: &str) -> OrderBook {
        match self.shard(symbol) {
            Some(shard) => shard.book.read().snapshot(symbol, &self.entries),
            None => OrderBook::empty(symbol),
        }
    }

    /// Value copy of the store metrics.
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Allocation statistics of the book-entry arena for one side.
    pub fn entry_stats(&self, side: BookSide) -> AllocationStatsSnapshot {
        self.entries.stats(side.into())
    }

    /// `true` if `symbol` currently has subscribers and an active book.
    pub fn has_book(&self, symbol: &str) -> bool {
        self.shard(symbol)
            .is_some_and(|shard| shard.book.read().active)
    }

    /// Number of callbacks registered for `symbol`.
    pub fn subscriber_count(&self, symbol: &str) -> usize {
        self.shard(symbol)
            .map_or(0, |shard| shard.subscriber_count())
    }

    /// Symbols with an active book, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .shards
            .iter()
            .filter(|shard| shard.value().book.read().active)
            .map(|shard| shard.key().clone())
            .collect();
        symbols.sort_unstable();
        symbols
    }

    /// Registered source names, sorted.
    pub fn source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.iter().map(|s| s.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Settings the store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn shard(&self, symbol: &str) -> Option<Arc<SymbolShard>> {
        self.shards.get(symbol).map(|shard| Arc::clone(shard.value()))
    }

    fn register(
        &self,
        symbol: &str,
        callback: MarketDataCallback,
    ) -> Option<(Arc<SymbolShard>, u64)> {
        let shard = self.shard_for_subscription(symbol)?;
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        shard.add_subscriber(Subscriber { id, callback });
        info!(symbol, subscriber = id, "subscribed");
        Some((shard, id))
    }

    fn shard_for_subscription(&self, symbol: &str) -> Option<Arc<SymbolShard>> {
        if let Some(shard) = self.shard(symbol) {
            return Some(shard);
        }
        match self.shards.entry(symbol.to_string()) {
            Entry::Occupied(occupied) => Some(Arc::clone(occupied.get())),
            Entry::Vacant(vacant) => {
                let max = self.config.max_symbols;
                let reserved = self
                    .symbol_count
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                        (count < max).then_some(count + 1)
                    })
                    .is_ok();
                if !reserved {
                    warn!(symbol, max_symbols = max, "symbol limit reached, subscription refused");
                    return None;
                }
                let shard = Arc::new(SymbolShard::new(symbol));
                vacant.insert(Arc::clone(&shard));
                Some(shard)
            }
        }
    }

    fn drop_update(&self, update: &MarketUpdate) {
        trace!(symbol = %update.symbol, source = %update.source, "update dropped");
        self.metrics.record_dropped(&update.symbol);
    }
}
