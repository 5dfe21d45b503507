//! Worker pool statistics

use super::task::TaskPriority;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a [`WorkerPool`](super::WorkerPool).
///
/// Per-worker completion counts live in a concurrent map keyed by worker id;
/// everything else is a plain atomic.
#[derive(Debug, Default)]
pub struct PoolStats {
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_panicked: AtomicU64,
    tasks_rejected: AtomicU64,
    tasks_cancelled: AtomicU64,
    total_wait_time_ns: AtomicU64,
    total_execution_time_ns: AtomicU64,
    tasks_by_priority: [AtomicU64; TaskPriority::COUNT],
    threads_spawned: AtomicU64,
    threads_retired: AtomicU64,
    tasks_per_worker: DashMap<usize, u64>,
}

impl PoolStats {
    pub(crate) fn record_submitted(&self, priority: TaskPriority) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
        self.tasks_by_priority[priority.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.tasks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self, count: usize) {
        self.tasks_cancelled.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_finished(
        &self,
        worker: usize,
        succeeded: bool,
        wait_ns: u64,
        execution_ns: u64,
    ) {
        if succeeded {
            self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
        }
        self.total_wait_time_ns.fetch_add(wait_ns, Ordering::Relaxed);
        self.total_execution_time_ns.fetch_add(execution_ns, Ordering::Relaxed);
        *self.tasks_per_worker.entry(worker).or_insert(0) += 1;
    }

    pub(crate) fn record_spawned(&self) {
        self.threads_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retired(&self) {
        self.threads_retired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        workers: usize,
        queue_size: usize,
        active_tasks: usize,
    ) -> PoolStatsSnapshot {
        let completed = self.tasks_completed.load(Ordering::Relaxed);
        let panicked = self.tasks_panicked.load(Ordering::Relaxed);
        let finished = completed + panicked;
        let mut tasks_per_worker: Vec<(usize, u64)> = self
            .tasks_per_worker
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        tasks_per_worker.sort_unstable();

        PoolStatsSnapshot {
            workers,
            queue_size,
            active_tasks,
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_completed: completed,
            tasks_panicked: panicked,
            tasks_rejected: self.tasks_rejected.load(Ordering::Relaxed),
            tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
            avg_wait_time_us: self
                .total_wait_time_ns
                .load(Ordering::Relaxed)
                .checked_div(finished)
                .unwrap_or(0)
                / 1_000,
            avg_execution_time_us: self
                .total_execution_time_ns
                .load(Ordering::Relaxed)
                .checked_div(finished)
                .unwrap_or(0)
                / 1_000,
            tasks_by_priority: std::array::from_fn(|i| {
                self.tasks_by_priority[i].load(Ordering::Relaxed)
            }),
            threads_spawned: self.threads_spawned.load(Ordering::Relaxed),
            threads_retired: self.threads_retired.load(Ordering::Relaxed),
            tasks_per_worker,
        }
    }
}

/// Point-in-time view of a worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatsSnapshot {
    /// Live worker threads
    pub workers: usize,
    /// Tasks waiting to be claimed
    pub queue_size: usize,
    /// Tasks currently running
    pub active_tasks: usize,
    /// Tasks accepted by `submit`
    pub tasks_submitted: u64,
    /// Tasks that ran to completion
    pub tasks_completed: u64,
    /// Tasks that panicked
    pub tasks_panicked: u64,
    /// Submissions refused because the pool was stopping
    pub tasks_rejected: u64,
    /// Queued tasks dropped by shutdown
    pub tasks_cancelled: u64,
    /// Mean time between submission and start, in microseconds
    pub avg_wait_time_us: u64,
    /// Mean run time, in microseconds
    pub avg_execution_time_us: u64,
    /// Accepted tasks per priority, indexed `Low`, `Medium`, `High`
    pub tasks_by_priority: [u64; TaskPriority::COUNT],
    /// Worker threads started over the pool's lifetime
    pub threads_spawned: u64,
    /// Worker threads that exited
    pub threads_retired: u64,
    /// Finished tasks per worker id, sorted by id
    pub tasks_per_worker: Vec<(usize, u64)>,
}
