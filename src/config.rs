/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Configuration for every component of the core.
//!
//! Each component has its own config struct with sensible defaults,
//! builder-style `with_*` setters and a `validate` method. [`CoreConfig`]
//! bundles all of them and can be loaded from JSON:
//!
//! ```rust
//! use marketcore_rs::config::CoreConfig;
//!
//! let config = CoreConfig::from_json_str(r#"{ "queue": { "capacity": 256 } }"#).unwrap();
//! assert_eq!(config.queue.capacity, 256);
//! assert_eq!(config.store.max_depth, 10);
//! ```
//!
//! Durations are stored as integer micro- or milliseconds so that the JSON form
//! stays flat; the typed accessors return [`Duration`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors produced while loading or validating configuration
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read configuration file {}: {message}", path.display())]
    Io {
        /// Path of the file
        path: PathBuf,
        /// Underlying I/O error message
        message: String,
    },

    /// The configuration text is not valid JSON for [`CoreConfig`]
    #[error("failed to parse configuration: {message}")]
    Parse {
        /// Underlying serde error message
        message: String,
    },

    /// A setting is outside its allowed range
    #[error("invalid configuration: {message}")]
    Invalid {
        /// Description of the offending setting
        message: String,
    },
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

/// Sizing of an [`Arena`](crate::arena::Arena).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Blocks carved for every category at construction
    pub initial_blocks_per_category: usize,
    /// Blocks carved when a category's free list runs dry
    pub growth_batch: usize,
    /// Upper bound on the blocks a single category may ever own; `None` is unbounded
    pub max_blocks_per_category: Option<usize>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_blocks_per_category: 1024,
            growth_batch: 1024,
            max_blocks_per_category: None,
        }
    }
}

impl ArenaConfig {
    /// Sets the number of blocks preallocated per category.
    pub fn with_initial_blocks(mut self, blocks: usize) -> Self {
        self.initial_blocks_per_category = blocks;
        self
    }

    /// Sets the number of blocks added when a free list is empty.
    pub fn with_growth_batch(mut self, blocks: usize) -> Self {
        self.growth_batch = blocks;
        self
    }

    /// Caps the number of blocks a category may own.
    pub fn with_max_blocks(mut self, blocks: usize) -> Self {
        self.max_blocks_per_category = Some(blocks);
        self
    }

    /// Checks that the settings can build an arena.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.growth_batch == 0 {
            return Err(invalid("arena growth_batch must be greater than zero"));
        }
        if let Some(max) = self.max_blocks_per_category
            && self.initial_blocks_per_category > max
        {
            return Err(invalid(format!(
                "arena initial_blocks_per_category ({}) exceeds max_blocks_per_category ({max})",
                self.initial_blocks_per_category
            )));
        }
        Ok(())
    }
}

/// Sizing and timing of a [`ConcurrentQueue`](crate::queue::ConcurrentQueue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of queued items
    pub capacity: usize,
    /// Nodes added to the node arena when it runs dry
    pub node_growth_batch: usize,
    /// Sleep between retries of timed operations once spinning is exhausted, in microseconds
    pub timed_poll_interval_us: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            node_growth_batch: 256,
            timed_poll_interval_us: 50,
        }
    }
}

impl QueueConfig {
    /// Creates a config with the given capacity and default timings.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Sets the sleep used by timed operations between retries.
    pub fn with_timed_poll_interval(mut self, interval: Duration) -> Self {
        self.timed_poll_interval_us = interval.as_micros() as u64;
        self
    }

    /// Sleep used by timed operations between retries.
    pub fn timed_poll_interval(&self) -> Duration {
        Duration::from_micros(self.timed_poll_interval_us)
    }

    /// Checks that the settings can build a queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(invalid("queue capacity must be greater than zero"));
        }
        if self.capacity >= u32::MAX as usize {
            return Err(invalid("queue capacity must fit in 32-bit node indices"));
        }
        if self.node_growth_batch == 0 {
            return Err(invalid("queue node_growth_batch must be greater than zero"));
        }
        Ok(())
    }
}

/// Sizing policy of a [`WorkerPool`](crate::pool::WorkerPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Workers started by the constructor
    pub initial_threads: usize,
    /// Floor for automatic shrinking
    pub min_threads: usize,
    /// Ceiling for automatic growth and explicit resizing
    pub max_threads: usize,
    /// The pool grows when queued tasks exceed `growth_threshold` per worker
    pub growth_threshold: usize,
    /// Idle time after which a worker above `min_threads` retires, in milliseconds
    pub idle_timeout_ms: u64,
    /// Prefix of worker thread names
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            initial_threads: cpus.min(4),
            min_threads: 1,
            max_threads: cpus.max(4),
            growth_threshold: 4,
            idle_timeout_ms: 5_000,
            thread_name_prefix: "marketcore-worker".to_string(),
        }
    }
}

impl PoolConfig {
    /// Creates a fixed-size config: initial, min and max are all `threads`.
    pub fn fixed(threads: usize) -> Self {
        Self {
            initial_threads: threads,
            min_threads: threads,
            max_threads: threads,
            ..Self::default()
        }
    }

    /// Sets the initial, minimum and maximum worker counts.
    pub fn with_threads(mut self, initial: usize, min: usize, max: usize) -> Self {
        self.initial_threads = initial;
        self.min_threads = min;
        self.max_threads = max;
        self
    }

    /// Sets the queued-tasks-per-worker ratio that triggers growth.
    pub fn with_growth_threshold(mut self, threshold: usize) -> Self {
        self.growth_threshold = threshold;
        self
    }

    /// Sets the idle timeout of workers above the minimum.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Idle timeout of workers above the minimum.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Checks that the settings describe a usable pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == 0 {
            return Err(invalid("pool max_threads must be greater than zero"));
        }
        if self.min_threads > self.max_threads {
            return Err(invalid(format!(
                "pool min_threads ({}) exceeds max_threads ({})",
                self.min_threads, self.max_threads
            )));
        }
        if self.initial_threads > self.max_threads {
            return Err(invalid(format!(
                "pool initial_threads ({}) exceeds max_threads ({})",
                self.initial_threads, self.max_threads
            )));
        }
        if self.growth_threshold == 0 {
            return Err(invalid("pool growth_threshold must be greater than zero"));
        }
        Ok(())
    }
}

/// Behaviour of a [`MarketDataStore`](crate::store::MarketDataStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of distinct symbols that may be subscribed
    pub max_symbols: usize,
    /// Price levels kept per side of every book
    pub max_depth: usize,
    /// Processing time above which an update counts as contended, in microseconds
    pub contention_threshold_us: u64,
    /// Capacity of each source's inbound update queue
    pub source_queue_capacity: usize,
    /// Wait used by source threads when their queue is empty, in microseconds
    pub source_poll_interval_us: u64,
    /// Weight of the newest sample in the per-source latency moving average
    pub latency_ema_alpha: f64,
    /// Arena backing book entries (categories: bid, ask)
    pub entry_arena: ArenaConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_symbols: 1024,
            max_depth: 10,
            contention_threshold_us: 100,
            source_queue_capacity: 4096,
            source_poll_interval_us: 1_000,
            latency_ema_alpha: 0.1,
            entry_arena: ArenaConfig::default().with_initial_blocks(256),
        }
    }
}

impl StoreConfig {
    /// Sets the maximum number of subscribed symbols.
    pub fn with_max_symbols(mut self, max_symbols: usize) -> Self {
        self.max_symbols = max_symbols;
        self
    }

    /// Sets the number of price levels kept per side.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the processing time above which an update counts as contended.
    pub fn with_contention_threshold(mut self, threshold: Duration) -> Self {
        self.contention_threshold_us = threshold.as_micros() as u64;
        self
    }

    /// Sets the capacity of every source's inbound queue.
    pub fn with_source_queue_capacity(mut self, capacity: usize) -> Self {
        self.source_queue_capacity = capacity;
        self
    }

    /// Replaces the book-entry arena settings.
    pub fn with_entry_arena(mut self, arena: ArenaConfig) -> Self {
        self.entry_arena = arena;
        self
    }

    /// Processing time above which an update counts as contended.
    pub fn contention_threshold(&self) -> Duration {
        Duration::from_micros(self.contention_threshold_us)
    }

    /// Wait used by source threads when their queue is empty.
    pub fn source_poll_interval(&self) -> Duration {
        Duration::from_micros(self.source_poll_interval_us)
    }

    /// Checks that the settings describe a usable store.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_symbols == 0 {
            return Err(invalid("store max_symbols must be greater than zero"));
        }
        if self.max_depth == 0 {
            return Err(invalid("store max_depth must be greater than zero"));
        }
        if !(self.latency_ema_alpha > 0.0 && self.latency_ema_alpha <= 1.0) {
            return Err(invalid(format!(
                "store latency_ema_alpha must be in (0, 1], got {}",
                self.latency_ema_alpha
            )));
        }
        QueueConfig::with_capacity(self.source_queue_capacity).validate()?;
        self.entry_arena.validate()
    }
}

/// Configuration of the whole core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Settings for standalone arenas
    pub arena: ArenaConfig,
    /// Settings for standalone queues
    pub queue: QueueConfig,
    /// Worker pool settings
    pub pool: PoolConfig,
    /// Order-book store settings
    pub store: StoreConfig,
}

impl CoreConfig {
    /// Parses and validates a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arena.validate()?;
        self.queue.validate()?;
        self.pool.validate()?;
        self.store.validate()
    }
}
