//! Queue statistics

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters of a [`ConcurrentQueue`](super::ConcurrentQueue).
#[derive(Debug)]
pub struct QueueStats {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    peak_size: AtomicU64,
    failed_enqueues: AtomicU64,
    failed_dequeues: AtomicU64,
    timeouts: AtomicU64,
    min_enqueue_time_ns: AtomicU64,
    max_enqueue_time_ns: AtomicU64,
    total_enqueue_time_ns: AtomicU64,
}

impl Default for QueueStats {
    fn default() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            dequeued: AtomicU64::new(0),
            peak_size: AtomicU64::new(0),
            failed_enqueues: AtomicU64::new(0),
            failed_dequeues: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            min_enqueue_time_ns: AtomicU64::new(u64::MAX),
            max_enqueue_time_ns: AtomicU64::new(0),
            total_enqueue_time_ns: AtomicU64::new(0),
        }
    }
}

impl QueueStats {
    #[inline]
    pub(crate) fn record_enqueue(&self, size: usize, elapsed_ns: u64) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.peak_size.fetch_max(size as u64, Ordering::Relaxed);
        self.min_enqueue_time_ns.fetch_min(elapsed_ns, Ordering::Relaxed);
        self.max_enqueue_time_ns.fetch_max(elapsed_ns, Ordering::Relaxed);
        self.total_enqueue_time_ns.fetch_add(elapsed_ns, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dequeue(&self) {
        self.dequeued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_failed_enqueue(&self) {
        self.failed_enqueues.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_failed_dequeue(&self) {
        self.failed_dequeues.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self, size: usize) {
        self.enqueued.store(0, Ordering::Relaxed);
        self.dequeued.store(0, Ordering::Relaxed);
        self.peak_size.store(size as u64, Ordering::Relaxed);
        self.failed_enqueues.store(0, Ordering::Relaxed);
        self.failed_dequeues.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.min_enqueue_time_ns.store(u64::MAX, Ordering::Relaxed);
        self.max_enqueue_time_ns.store(0, Ordering::Relaxed);
        self.total_enqueue_time_ns.store(0, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, current_size: usize) -> QueueStatsSnapshot {
        let min = self.min_enqueue_time_ns.load(Ordering::Relaxed);
        QueueStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
            current_size: current_size as u64,
            peak_size: self.peak_size.load(Ordering::Relaxed),
            failed_enqueues: self.failed_enqueues.load(Ordering::Relaxed),
            failed_dequeues: self.failed_dequeues.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            min_enqueue_time_ns: if min == u64::MAX { 0 } else { min },
            max_enqueue_time_ns: self.max_enqueue_time_ns.load(Ordering::Relaxed),
            total_enqueue_time_ns: self.total_enqueue_time_ns.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`QueueStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatsSnapshot {
    /// Items accepted
    pub enqueued: u64,
    /// Items handed to consumers
    pub dequeued: u64,
    /// Approximate number of queued items
    pub current_size: u64,
    /// Highest observed size
    pub peak_size: u64,
    /// Enqueue attempts rejected because the queue was full or out of nodes
    pub failed_enqueues: u64,
    /// Dequeue attempts that found the queue empty
    pub failed_dequeues: u64,
    /// Timed operations that gave up at their deadline
    pub timeouts: u64,
    /// Fastest accepted enqueue
    pub min_enqueue_time_ns: u64,
    /// Slowest accepted enqueue
    pub max_enqueue_time_ns: u64,
    /// Sum of accepted enqueue latencies
    pub total_enqueue_time_ns: u64,
}

impl QueueStatsSnapshot {
    /// Mean latency of accepted enqueues in nanoseconds.
    #[must_use]
    pub fn avg_enqueue_time_ns(&self) -> u64 {
        self.total_enqueue_time_ns
            .checked_div(self.enqueued)
            .unwrap_or(0)
    }
}
