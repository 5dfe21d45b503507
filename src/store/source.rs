//! Feed sources: inbound queues and the threads that drain them.

use super::MarketDataStore;
use super::book::MarketUpdate;
use crate::queue::ConcurrentQueue;
use crossbeam::utils::Backoff;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info};

/// Updates taken from a source queue per pass.
const SOURCE_BATCH: usize = 64;

/// A registered update origin and its inbound queue.
pub(crate) struct SourceFeed {
    pub(crate) name: String,
    pub(crate) queue: ConcurrentQueue<MarketUpdate>,
}

/// Handle to the running source threads of a store.
///
/// [`stop`](SourceRunner::stop) signals every thread, waits for each to drain
/// its queue and joins it. Dropping the runner does the same.
pub struct SourceRunner {
    store: Arc<MarketDataStore>,
    stop: Arc<AtomicBool>,
    threads: Vec<(String, JoinHandle<u64>)>,
    halted: bool,
}

impl std::fmt::Debug for SourceRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRunner")
            .field("sources", &self.sources())
            .field("stopping", &self.stop.load(Ordering::Relaxed))
            .finish()
    }
}

impl SourceRunner {
    pub(crate) fn new(store: Arc<MarketDataStore>, stop: Arc<AtomicBool>) -> Self {
        Self {
            store,
            stop,
            threads: Vec::new(),
            halted: false,
        }
    }

    pub(crate) fn push(&mut self, source: String, handle: JoinHandle<u64>) {
        self.threads.push((source, handle));
    }

    /// Names of the sources served by this runner.
    pub fn sources(&self) -> Vec<&str> {
        self.threads.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Stops and joins every source thread. Returns the number of updates the
    /// threads processed in total.
    pub fn stop(mut self) -> u64 {
        self.halt()
    }

    fn halt(&mut self) -> u64 {
        self.stop.store(true, Ordering::Release);
        let mut processed = 0;
        for (source, handle) in self.threads.drain(..) {
            match handle.join() {
                Ok(count) => processed += count,
                Err(_) => error!(source = %source, "source thread terminated abnormally"),
            }
        }
        self.store.running.store(false, Ordering::Release);
        self.halted = true;
        processed
    }
}

impl Drop for SourceRunner {
    fn drop(&mut self) {
        if !self.halted {
            self.halt();
        }
    }
}

/// Body of a source thread: applies queued updates until stopped, then drains
/// whatever is left in the queue.
pub(crate) fn run_source(
    store: Arc<MarketDataStore>,
    feed: Arc<SourceFeed>,
    stop: Arc<AtomicBool>,
    poll_interval: Duration,
) -> u64 {
    info!(source = %feed.name, "source thread started");
    let backoff = Backoff::new();
    let mut processed = 0u64;
    loop {
        let stopping = stop.load(Ordering::Acquire);
        let batch = feed.queue.bulk_dequeue(SOURCE_BATCH);
        if batch.is_empty() {
            if stopping {
                break;
            }
            if backoff.is_completed() {
                std::thread::sleep(poll_interval);
            } else {
                backoff.snooze();
            }
            continue;
        }
        backoff.reset();
        for update in &batch {
            store.process_update(update);
        }
        processed += batch.len() as u64;
    }
    info!(source = %feed.name, processed, "source thread stopped");
    processed
}
