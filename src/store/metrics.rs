//! Store metrics.
//!
//! Totals are atomics. Per-source figures sit behind their own mutex, which no
//! book lock ever waits on.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

#[derive(Debug, Default)]
struct SourceMetrics {
    avg_latency_us: f64,
    processed: u64,
    first_update: Option<Instant>,
}

#[derive(Debug)]
pub(crate) struct StoreMetrics {
    processed: AtomicU64,
    dropped: AtomicU64,
    lock_contentions: AtomicU64,
    lock_wait_time_ns: AtomicU64,
    callback_failures: AtomicU64,
    allocation_failures: AtomicU64,
    contention_threshold: Duration,
    ema_alpha: f64,
    sources: Mutex<HashMap<String, SourceMetrics>>,
}

impl StoreMetrics {
    pub(crate) fn new(contention_threshold: Duration, ema_alpha: f64) -> Self {
        Self {
            processed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            lock_contentions: AtomicU64::new(0),
            lock_wait_time_ns: AtomicU64::new(0),
            callback_failures: AtomicU64::new(0),
            allocation_failures: AtomicU64::new(0),
            contention_threshold,
            ema_alpha,
            sources: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn register_source(&self, source: &str) {
        self.sources.lock().entry(source.to_string()).or_default();
    }

    pub(crate) fn record_dropped(&self, symbol: &str) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        counter!("marketcore_updates_dropped_total", "symbol" => symbol.to_string()).increment(1);
        #[cfg(not(feature = "metrics"))]
        let _ = symbol;
    }

    pub(crate) fn record_callback_failure(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_allocation_failure(&self) {
        self.allocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one applied update and its end-to-end processing time.
    pub(crate) fn record_processed(&self, source: &str, elapsed: Duration) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if elapsed > self.contention_threshold {
            self.lock_contentions.fetch_add(1, Ordering::Relaxed);
            // Half of an over-threshold update is attributed to waiting.
            self.lock_wait_time_ns
                .fetch_add(elapsed.as_nanos() as u64 / 2, Ordering::Relaxed);
        }

        let sample_us = elapsed.as_secs_f64() * 1_000_000.0;
        {
            let mut sources = self.sources.lock();
            if !sources.contains_key(source) {
                sources.insert(source.to_string(), SourceMetrics::default());
            }
            if let Some(entry) = sources.get_mut(source) {
                entry.avg_latency_us = if entry.processed == 0 {
                    sample_us
                } else {
                    entry.avg_latency_us * (1.0 - self.ema_alpha) + sample_us * self.ema_alpha
                };
                entry.processed += 1;
                entry.first_update.get_or_insert_with(Instant::now);
            }
        }

        #[cfg(feature = "metrics")]
        {
            counter!("marketcore_updates_processed_total", "source" => source.to_string())
                .increment(1);
            histogram!("marketcore_update_latency_us", "source" => source.to_string())
                .record(sample_us);
        }
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot {
            total_updates_processed: self.processed.load(Ordering::Relaxed),
            total_updates_dropped: self.dropped.load(Ordering::Relaxed),
            lock_contentions: self.lock_contentions.load(Ordering::Relaxed),
            lock_wait_time_ns: self.lock_wait_time_ns.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
            ..MetricsSnapshot::default()
        };

        let sources = self.sources.lock();
        for (name, source) in sources.iter() {
            let throughput = match source.first_update {
                Some(first) => {
                    let secs = first.elapsed().as_secs_f64();
                    if secs > 0.0 {
                        source.processed as f64 / secs
                    } else {
                        0.0
                    }
                }
                None => 0.0,
            };
            snapshot
                .avg_latency_us
                .insert(name.clone(), source.avg_latency_us);
            snapshot.throughput_mps.insert(name.clone(), throughput);
            snapshot
                .updates_by_source
                .insert(name.clone(), source.processed);
        }
        snapshot
    }
}

/// Value copy of the store metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Updates applied to a book
    pub total_updates_processed: u64,
    /// Updates for unknown or unsubscribed symbols
    pub total_updates_dropped: u64,
    /// Updates whose processing exceeded the contention threshold
    pub lock_contentions: u64,
    /// Estimated time spent waiting on locks by contended updates
    pub lock_wait_time_ns: u64,
    /// Callbacks that panicked
    pub callback_failures: u64,
    /// Book levels skipped because the entry arena was exhausted
    pub allocation_failures: u64,
    /// Exponential moving average of processing latency per source, in microseconds
    pub avg_latency_us: HashMap<String, f64>,
    /// Updates per second per source since its first update
    pub throughput_mps: HashMap<String, f64>,
    /// Applied updates per source
    pub updates_by_source: HashMap<String, u64>,
}
