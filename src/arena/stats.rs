//! Per-category allocation statistics.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters kept by every category of an arena.
///
/// Updated with relaxed atomic read-modify-write operations only. Readers get
/// an eventually consistent view through [`AllocationStats::snapshot`].
#[derive(Debug)]
pub struct AllocationStats {
    total_allocations: AtomicU64,
    total_deallocations: AtomicU64,
    current_allocations: AtomicU64,
    peak_allocations: AtomicU64,
    total_bytes_allocated: AtomicU64,
    allocation_failures: AtomicU64,
    growth_events: AtomicU64,
    min_allocation_time_ns: AtomicU64,
    max_allocation_time_ns: AtomicU64,
    total_allocation_time_ns: AtomicU64,
}

impl Default for AllocationStats {
    fn default() -> Self {
        Self {
            total_allocations: AtomicU64::new(0),
            total_deallocations: AtomicU64::new(0),
            current_allocations: AtomicU64::new(0),
            peak_allocations: AtomicU64::new(0),
            total_bytes_allocated: AtomicU64::new(0),
            allocation_failures: AtomicU64::new(0),
            growth_events: AtomicU64::new(0),
            min_allocation_time_ns: AtomicU64::new(u64::MAX),
            max_allocation_time_ns: AtomicU64::new(0),
            total_allocation_time_ns: AtomicU64::new(0),
        }
    }
}

impl AllocationStats {
    #[inline]
    pub(crate) fn record_allocation(&self, bytes: u64, elapsed_ns: u64) {
        self.total_allocations.fetch_add(1, Ordering::Relaxed);
        let current = self.current_allocations.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_allocations.fetch_max(current, Ordering::Relaxed);
        self.total_bytes_allocated.fetch_add(bytes, Ordering::Relaxed);
        self.min_allocation_time_ns.fetch_min(elapsed_ns, Ordering::Relaxed);
        self.max_allocation_time_ns.fetch_max(elapsed_ns, Ordering::Relaxed);
        self.total_allocation_time_ns.fetch_add(elapsed_ns, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_deallocation(&self) {
        self.total_deallocations.fetch_add(1, Ordering::Relaxed);
        self.current_allocations.fetch_sub(1, Ordering::Relaxed);
    }

    #[cold]
    pub(crate) fn record_failure(&self) {
        self.allocation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_growth(&self) {
        self.growth_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Clears every counter except the outstanding allocation count, which
    /// still describes live handles. The peak restarts from that count.
    pub(crate) fn reset(&self) {
        let current = self.current_allocations.load(Ordering::Relaxed);
        self.total_allocations.store(0, Ordering::Relaxed);
        self.total_deallocations.store(0, Ordering::Relaxed);
        self.peak_allocations.store(current, Ordering::Relaxed);
        self.total_bytes_allocated.store(0, Ordering::Relaxed);
        self.allocation_failures.store(0, Ordering::Relaxed);
        self.growth_events.store(0, Ordering::Relaxed);
        self.min_allocation_time_ns.store(u64::MAX, Ordering::Relaxed);
        self.max_allocation_time_ns.store(0, Ordering::Relaxed);
        self.total_allocation_time_ns.store(0, Ordering::Relaxed);
    }

    /// Copies the counters into a plain value.
    pub fn snapshot(&self) -> AllocationStatsSnapshot {
        let min = self.min_allocation_time_ns.load(Ordering::Relaxed);
        AllocationStatsSnapshot {
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
            total_deallocations: self.total_deallocations.load(Ordering::Relaxed),
            current_allocations: self.current_allocations.load(Ordering::Relaxed),
            peak_allocations: self.peak_allocations.load(Ordering::Relaxed),
            total_bytes_allocated: self.total_bytes_allocated.load(Ordering::Relaxed),
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
            growth_events: self.growth_events.load(Ordering::Relaxed),
            min_allocation_time_ns: if min == u64::MAX { 0 } else { min },
            max_allocation_time_ns: self.max_allocation_time_ns.load(Ordering::Relaxed),
            total_allocation_time_ns: self.total_allocation_time_ns.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`AllocationStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AllocationStatsSnapshot {
    /// Successful allocations since creation or the last reset
    pub total_allocations: u64,
    /// Deallocations since creation or the last reset
    pub total_deallocations: u64,
    /// Blocks currently handed out
    pub current_allocations: u64,
    /// Highest number of blocks handed out at once
    pub peak_allocations: u64,
    /// Bytes of block storage handed out, counted per allocation
    pub total_bytes_allocated: u64,
    /// Allocations that failed because the category could not grow
    pub allocation_failures: u64,
    /// Number of times the category carved a new segment
    pub growth_events: u64,
    /// Fastest allocation, 0 when nothing was allocated
    pub min_allocation_time_ns: u64,
    /// Slowest allocation
    pub max_allocation_time_ns: u64,
    /// Sum of all allocation latencies
    pub total_allocation_time_ns: u64,
}

impl AllocationStatsSnapshot {
    /// Mean allocation latency in nanoseconds.
    #[must_use]
    pub fn avg_allocation_time_ns(&self) -> u64 {
        self.total_allocation_time_ns
            .checked_div(self.total_allocations)
            .unwrap_or(0)
    }
}
