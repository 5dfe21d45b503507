//! Priority-aware worker pool with future-based submission.
//!
//! Tasks wait in a priority heap guarded by a mutex; workers park on a
//! condition variable while the heap is empty. The pool grows one worker at a
//! time when the backlog exceeds `growth_threshold` tasks per worker, and idle
//! workers above `min_threads` retire after `idle_timeout`.
//!
//! ```rust
//! use marketcore_rs::config::PoolConfig;
//! use marketcore_rs::pool::{TaskPriority, WorkerPool};
//!
//! let pool = WorkerPool::new(PoolConfig::fixed(2)).unwrap();
//! let handle = pool.submit(TaskPriority::High, || 6 * 7).unwrap();
//! assert_eq!(handle.wait(), Ok(42));
//! pool.shutdown();
//! ```

mod error;
mod stats;
mod task;
mod tests;

pub use error::{PoolError, TaskError};
pub use stats::{PoolStats, PoolStatsSnapshot};
pub use task::{TaskHandle, TaskPriority};

use crate::config::PoolConfig;
use parking_lot::{Condvar, Mutex};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use task::PrioritizedTask;
use tracing::{debug, error, info, trace, warn};

/// Scheduling state, all guarded by one mutex.
struct Schedule {
    heap: BinaryHeap<PrioritizedTask>,
    next_sequence: u64,
    next_worker_id: usize,
    /// Live worker threads
    workers: usize,
    /// Upper bound on workers, set by `resize`
    limit: usize,
    /// Workers below this count never retire on idle timeout
    floor: usize,
    /// Tasks claimed and running
    active: usize,
    stopping: bool,
}

struct Shared {
    config: PoolConfig,
    schedule: Mutex<Schedule>,
    /// Signalled when a task is queued or the pool stops
    task_ready: Condvar,
    /// Signalled when the pool may have become idle
    drained: Condvar,
    handles: Mutex<Vec<JoinHandle<()>>>,
    stats: PoolStats,
}

/// A pool of OS threads running prioritized closures.
///
/// Dropping the pool shuts it down: queued tasks are cancelled, running tasks
/// finish, and the worker threads are joined.
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let schedule = self.shared.schedule.lock();
        f.debug_struct("WorkerPool")
            .field("workers", &schedule.workers)
            .field("queued", &schedule.heap.len())
            .field("active", &schedule.active)
            .field("stopping", &schedule.stopping)
            .finish()
    }
}

impl WorkerPool {
    /// Starts a pool with `config.initial_threads` workers.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(|e| PoolError::InvalidConfig {
            message: e.to_string(),
        })?;

        let initial = config.initial_threads;
        let schedule = Schedule {
            heap: BinaryHeap::new(),
            next_sequence: 0,
            next_worker_id: 0,
            workers: 0,
            limit: config.max_threads,
            floor: config.min_threads,
            active: 0,
            stopping: false,
        };
        let pool = WorkerPool {
            shared: Arc::new(Shared {
                config,
                schedule: Mutex::new(schedule),
                task_ready: Condvar::new(),
                drained: Condvar::new(),
                handles: Mutex::new(Vec::new()),
                stats: PoolStats::default(),
            }),
        };

        for _ in 0..initial {
            let id = pool.claim_worker_slot();
            pool.spawn_worker(id)?;
        }
        info!(
            workers = initial,
            min = pool.shared.config.min_threads,
            max = pool.shared.config.max_threads,
            "worker pool started"
        );
        Ok(pool)
    }

    /// Queues `func` and returns a handle to its result.
    ///
    /// Never blocks beyond the short scheduling lock. Fails with
    /// [`PoolError::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun.
    pub fn submit<F, R>(&self, priority: TaskPriority, func: F) -> Result<TaskHandle<R>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut schedule = self.shared.schedule.lock();
        if schedule.stopping {
            drop(schedule);
            self.shared.stats.record_rejected();
            warn!(%priority, "task rejected: worker pool is shutting down");
            return Err(PoolError::ShuttingDown);
        }

        let sequence = schedule.next_sequence;
        schedule.next_sequence += 1;
        let (task, handle) = PrioritizedTask::package(priority, sequence, func);
        schedule.heap.push(task);
        self.shared.stats.record_submitted(priority);

        let depth = schedule.heap.len();
        let grow = depth > self.shared.config.growth_threshold * schedule.workers
            && schedule.workers < schedule.limit;
        let new_worker = grow.then(|| Self::reserve_worker(&mut schedule));
        drop(schedule);
        self.shared.task_ready.notify_one();

        if let Some(id) = new_worker {
            debug!(depth, worker = id, "backlog above threshold, adding worker");
            if let Err(err) = self.spawn_worker(id) {
                warn!(error = %err, "failed to grow worker pool");
            }
        }
        trace!(%priority, sequence, "task submitted");
        Ok(handle)
    }

    /// Sets the number of workers to `threads`, clamped to `max_threads`.
    ///
    /// Growing starts the missing workers immediately. Shrinking is applied at
    /// each surplus worker's next idle point, after the queue is drained, so
    /// claimed and already queued tasks still run. `resize(0)` is allowed.
    pub fn resize(&self, threads: usize) -> Result<(), PoolError> {
        let target = threads.min(self.shared.config.max_threads);
        let mut schedule = self.shared.schedule.lock();
        if schedule.stopping {
            return Err(PoolError::ShuttingDown);
        }
        schedule.limit = target;
        schedule.floor = self.shared.config.min_threads.min(target);
        let missing = target.saturating_sub(schedule.workers);
        let ids: Vec<usize> = (0..missing)
            .map(|_| Self::reserve_worker(&mut schedule))
            .collect();
        let current = schedule.workers;
        drop(schedule);

        // Wake idle workers so surplus ones notice the new limit.
        self.shared.task_ready.notify_all();
        info!(requested = threads, target, workers = current, "worker pool resized");
        for id in ids {
            self.spawn_worker(id)?;
        }
        Ok(())
    }

    /// Number of live worker threads.
    pub fn size(&self) -> usize {
        self.shared.schedule.lock().workers
    }

    /// Number of tasks waiting to be claimed.
    pub fn queue_size(&self) -> usize {
        self.shared.schedule.lock().heap.len()
    }

    /// Number of tasks currently running.
    pub fn active_tasks(&self) -> usize {
        self.shared.schedule.lock().active
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStatsSnapshot {
        let (workers, queued, active) = {
            let schedule = self.shared.schedule.lock();
            (schedule.workers, schedule.heap.len(), schedule.active)
        };
        self.shared.stats.snapshot(workers, queued, active)
    }

    /// Waits until no task is queued or running. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut schedule = self.shared.schedule.lock();
        while !(schedule.heap.is_empty() && schedule.active == 0) {
            if self
                .shared
                .drained
                .wait_until(&mut schedule, deadline)
                .timed_out()
            {
                return schedule.heap.is_empty() && schedule.active == 0;
            }
        }
        true
    }

    /// Stops the pool: refuses new tasks, cancels queued ones, lets running
    /// tasks finish and joins every worker. Idempotent.
    ///
    /// Calling it from inside a task skips joining the calling worker.
    pub fn shutdown(&self) {
        let cancelled = {
            let mut schedule = self.shared.schedule.lock();
            if schedule.stopping {
                Vec::new()
            } else {
                schedule.stopping = true;
                std::mem::take(&mut schedule.heap).into_vec()
            }
        };
        self.shared.task_ready.notify_all();
        self.shared.drained.notify_all();

        if !cancelled.is_empty() {
            self.shared.stats.record_cancelled(cancelled.len());
            warn!(count = cancelled.len(), "cancelling queued tasks on shutdown");
        }
        for task in cancelled {
            task.job.cancel();
        }

        let handles = std::mem::take(&mut *self.shared.handles.lock());
        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }
    }

    fn claim_worker_slot(&self) -> usize {
        Self::reserve_worker(&mut self.shared.schedule.lock())
    }

    /// Counts a worker as live before its thread exists, so concurrent growth
    /// decisions see it.
    fn reserve_worker(schedule: &mut Schedule) -> usize {
        let id = schedule.next_worker_id;
        schedule.next_worker_id += 1;
        schedule.workers += 1;
        id
    }

    fn spawn_worker(&self, id: usize) -> Result<(), PoolError> {
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("{}-{id}", self.shared.config.thread_name_prefix))
            .spawn(move || worker_loop(shared, id));
        match spawned {
            Ok(handle) => {
                self.shared.stats.record_spawned();
                let mut handles = self.shared.handles.lock();
                handles.retain(|h| !h.is_finished());
                handles.push(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.schedule.lock().workers -= 1;
                Err(PoolError::SpawnFailed {
                    message: err.to_string(),
                })
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>, id: usize) {
    debug!(worker = id, "worker started");
    let idle_timeout = shared.config.idle_timeout();
    loop {
        let task = {
            let mut schedule = shared.schedule.lock();
            loop {
                if schedule.stopping {
                    retire(&shared, &mut schedule, id, "pool stopping");
                    return;
                }
                if let Some(task) = schedule.heap.pop() {
                    schedule.active += 1;
                    break task;
                }
                if schedule.workers > schedule.limit {
                    retire(&shared, &mut schedule, id, "pool resized");
                    return;
                }
                let timed_out = shared
                    .task_ready
                    .wait_for(&mut schedule, idle_timeout)
                    .timed_out();
                if timed_out
                    && schedule.heap.is_empty()
                    && !schedule.stopping
                    && schedule.workers > schedule.floor
                {
                    retire(&shared, &mut schedule, id, "idle timeout");
                    return;
                }
            }
        };

        let started = Instant::now();
        let wait_ns = started.duration_since(task.enqueued_at).as_nanos() as u64;
        let priority = task.priority;
        task.job.run(&mut |succeeded| {
            let execution_ns = started.elapsed().as_nanos() as u64;
            if !succeeded {
                error!(worker = id, %priority, "task panicked");
            }
            shared
                .stats
                .record_finished(id, succeeded, wait_ns, execution_ns);
        });

        let mut schedule = shared.schedule.lock();
        schedule.active -= 1;
        if schedule.active == 0 && schedule.heap.is_empty() {
            shared.drained.notify_all();
        }
    }
}

fn retire(shared: &Shared, schedule: &mut Schedule, id: usize, reason: &str) {
    schedule.workers -= 1;
    shared.stats.record_retired();
    if schedule.workers == 0 {
        shared.drained.notify_all();
    }
    debug!(worker = id, reason, remaining = schedule.workers, "worker stopped");
}
