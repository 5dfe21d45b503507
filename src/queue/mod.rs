//! Bounded lock-free multi-producer/multi-consumer queue.
//!
//! [`ConcurrentQueue`] is a Michael–Scott queue whose nodes live in an
//! [`Arena`](crate::arena::Arena). Links are `(tag, index)` words, so a CAS
//! against a node that was freed and reused in the meantime fails on the tag.
//!
//! A dequeuer only reads a payload after its head CAS has claimed it. Because
//! another dequeuer may already have moved `head` past that node, a node goes
//! back to the arena only once both the payload was taken and the node was
//! retired as dummy, whichever happens last.

mod error;
mod node;
mod stats;
mod tests;

pub use error::QueueError;
pub use stats::{QueueStats, QueueStatsSnapshot};

use crate::arena::{Arena, CategoryId, MAX_SEGMENTS, NULL_INDEX, pack_tagged, unpack_tagged};
use crate::config::{ArenaConfig, QueueConfig};
use crossbeam::utils::{Backoff, CachePadded};
use node::{QueueNode, RELEASED, RETIRED, TAKEN};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

const NODE_CATEGORY: CategoryId = CategoryId(0);

/// Nodes preallocated up front at most; larger queues grow their node arena on demand.
const MAX_PREALLOCATED_NODES: usize = 4096;

/// Bounded lock-free MPMC queue.
///
/// Items enqueued by one thread are dequeued in that thread's order; there is
/// no global order across producers.
///
/// # Examples
///
/// ```rust
/// use marketcore_rs::queue::ConcurrentQueue;
///
/// let queue = ConcurrentQueue::new(2).unwrap();
/// assert!(queue.enqueue("a").is_ok());
/// assert!(queue.enqueue("b").is_ok());
/// assert_eq!(queue.enqueue("c"), Err("c"));
/// assert_eq!(queue.dequeue(), Some("a"));
/// ```
pub struct ConcurrentQueue<T: Send> {
    head: CachePadded<AtomicU64>,
    tail: CachePadded<AtomicU64>,
    size: CachePadded<AtomicUsize>,
    capacity: usize,
    poll_interval: Duration,
    nodes: Arena<QueueNode<T>>,
    stats: QueueStats,
}

impl<T: Send> std::fmt::Debug for ConcurrentQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T: Send> ConcurrentQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        Self::with_config(QueueConfig::with_capacity(capacity))
    }

    /// Creates a queue from a full configuration.
    pub fn with_config(config: QueueConfig) -> Result<Self, QueueError> {
        config
            .validate()
            .map_err(|e| QueueError::InvalidCapacity {
                capacity: config.capacity,
                message: e.to_string(),
            })?;

        // One node per queued item plus the dummy. The growth batch is raised
        // so that the remaining segment slots always cover the full capacity.
        let nodes_needed = config.capacity + 1;
        let growth_batch = config
            .node_growth_batch
            .max(nodes_needed.div_ceil(MAX_SEGMENTS - 1));
        let arena_config = ArenaConfig::default()
            .with_initial_blocks(nodes_needed.min(MAX_PREALLOCATED_NODES))
            .with_growth_batch(growth_batch);
        let nodes: Arena<QueueNode<T>> = Arena::new(1, arena_config)?;

        let dummy = nodes.allocate_in_place(NODE_CATEGORY)?.into_raw();
        // SAFETY: `dummy` was just allocated from `nodes` and no one else knows it.
        let dummy_node = unsafe { nodes.get_raw(NODE_CATEGORY, dummy) };
        // The first dummy carries no payload, so it starts out taken.
        dummy_node.handoff.store(TAKEN, Ordering::Relaxed);

        Ok(Self {
            head: CachePadded::new(AtomicU64::new(pack_tagged(0, dummy))),
            tail: CachePadded::new(AtomicU64::new(pack_tagged(0, dummy))),
            size: CachePadded::new(AtomicUsize::new(0)),
            capacity: config.capacity,
            poll_interval: config.timed_poll_interval(),
            nodes,
            stats: QueueStats::default(),
        })
    }

    /// Appends `item` without blocking. Hands the item back when the queue is
    /// full or no node could be allocated.
    pub fn enqueue(&self, item: T) -> Result<(), T> {
        self.push(item).inspect_err(|_| self.stats.record_failed_enqueue())
    }

    /// Like [`enqueue`](Self::enqueue), but keeps retrying until `timeout`
    /// elapses. On timeout nothing was linked and the item is handed back.
    pub fn try_enqueue(&self, item: T, timeout: Duration) -> Result<(), T> {
        let deadline = Instant::now() + timeout;
        let backoff = Backoff::new();
        let mut item = item;
        loop {
            match self.push(item) {
                Ok(()) => return Ok(()),
                Err(rejected) => item = rejected,
            }
            if !self.pause(&backoff, deadline) {
                self.stats.record_timeout();
                trace!(capacity = self.capacity, "timed enqueue gave up");
                return Err(item);
            }
        }
    }

    /// Removes the oldest item, or returns `None` when the queue is empty.
    pub fn dequeue(&self) -> Option<T> {
        let item = self.pop();
        if item.is_none() {
            self.stats.record_failed_dequeue();
        }
        item
    }

    /// Like [`dequeue`](Self::dequeue), but waits up to `timeout` for an item.
    pub fn try_dequeue(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let backoff = Backoff::new();
        loop {
            if let Some(item) = self.pop() {
                return Some(item);
            }
            if !self.pause(&backoff, deadline) {
                self.stats.record_timeout();
                return None;
            }
        }
    }

    /// Enqueues clones of `items` in order and returns how many were accepted.
    /// Stops at the first rejection.
    pub fn bulk_enqueue(&self, items: &[T]) -> usize
    where
        T: Clone,
    {
        let mut accepted = 0;
        for item in items {
            if self.enqueue(item.clone()).is_err() {
                break;
            }
            accepted += 1;
        }
        accepted
    }

    /// Dequeues up to `max` items.
    pub fn bulk_dequeue(&self, max: usize) -> Vec<T> {
        let mut items = Vec::with_capacity(max.min(self.capacity));
        while items.len() < max {
            match self.pop() {
                Some(item) => items.push(item),
                None => break,
            }
        }
        items
    }

    /// Drops every queued item. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut cleared = 0;
        while self.pop().is_some() {
            cleared += 1;
        }
        trace!(cleared, "queue cleared");
        cleared
    }

    /// Approximate number of queued items.
    #[inline]
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Approximate emptiness.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued items.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the queue counters.
    pub fn stats(&self) -> QueueStatsSnapshot {
        self.stats.snapshot(self.len())
    }

    /// Resets the counters; the peak restarts from the current size.
    pub fn reset_stats(&self) {
        self.stats.reset(self.len());
    }

    fn push(&self, item: T) -> Result<(), T> {
        let start = Instant::now();
        let Some(size) = self.reserve_slot() else {
            return Err(item);
        };
        let index = match self.allocate_node(item) {
            Ok(index) => index,
            Err(item) => {
                self.size.fetch_sub(1, Ordering::Release);
                return Err(item);
            }
        };
        self.link(index);
        self.stats
            .record_enqueue(size, start.elapsed().as_nanos() as u64);
        Ok(())
    }

    fn pop(&self) -> Option<T> {
        let backoff = Backoff::new();
        loop {
            let head = self.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Acquire);
            let (head_tag, head_index) = unpack_tagged(head);
            let (tail_tag, tail_index) = unpack_tagged(tail);
            let next = self.node(head_index).next.load(Ordering::Acquire);
            if head != self.head.load(Ordering::Acquire) {
                continue;
            }
            let (_, next_index) = unpack_tagged(next);

            if head_index == tail_index {
                if next_index == NULL_INDEX {
                    return None;
                }
                // Tail is lagging behind a linked node: help it forward.
                let _ = self.tail.compare_exchange(
                    tail,
                    pack_tagged(tail_tag.wrapping_add(1), next_index),
                    Ordering::Release,
                    Ordering::Relaxed,
                );
            } else if next_index != NULL_INDEX
                && self
                    .head
                    .compare_exchange(
                        head,
                        pack_tagged(head_tag.wrapping_add(1), next_index),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
            {
                // SAFETY: the head CAS made this thread the only reader of the
                // payload of `next_index`, which the enqueuer wrote before linking.
                let item = unsafe { (*self.node(next_index).value.get()).assume_init_read() };
                self.release(next_index, TAKEN);
                self.release(head_index, RETIRED);
                self.size.fetch_sub(1, Ordering::Release);
                self.stats.record_dequeue();
                return Some(item);
            }
            backoff.spin();
        }
    }

    /// Claims one unit of capacity and returns the resulting size.
    fn reserve_slot(&self) -> Option<usize> {
        let mut size = self.size.load(Ordering::Relaxed);
        loop {
            if size >= self.capacity {
                return None;
            }
            match self.size.compare_exchange_weak(
                size,
                size + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(size + 1),
                Err(actual) => size = actual,
            }
        }
    }

    fn allocate_node(&self, item: T) -> Result<u32, T> {
        let handle = match self.nodes.allocate_in_place(NODE_CATEGORY) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(error = %err, "queue node allocation failed");
                return Err(item);
            }
        };
        let index = handle.into_raw();
        let node = self.node(index);
        // Bump the tag so that stale CAS attempts against the node's previous
        // life fail.
        let (tag, _) = unpack_tagged(node.next.load(Ordering::Relaxed));
        node.next
            .store(pack_tagged(tag.wrapping_add(1), NULL_INDEX), Ordering::Relaxed);
        node.handoff.store(0, Ordering::Relaxed);
        // SAFETY: the node is allocated to this thread and not linked yet, so
        // nobody else reads or writes its payload.
        unsafe { (*node.value.get()).write(item) };
        Ok(index)
    }

    fn link(&self, index: u32) {
        let backoff = Backoff::new();
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let (tail_tag, tail_index) = unpack_tagged(tail);
            let tail_node = self.node(tail_index);
            let next = tail_node.next.load(Ordering::Acquire);
            if tail != self.tail.load(Ordering::Acquire) {
                continue;
            }
            let (next_tag, next_index) = unpack_tagged(next);
            if next_index == NULL_INDEX {
                if tail_node
                    .next
                    .compare_exchange(
                        next,
                        pack_tagged(next_tag.wrapping_add(1), index),
                        Ordering::Release,
                        Ordering::Relaxed,
                    )
                    .is_ok()
                {
                    // Best effort; a later operation helps if this fails.
                    let _ = self.tail.compare_exchange(
                        tail,
                        pack_tagged(tail_tag.wrapping_add(1), index),
                        Ordering::Release,
                        Ordering::Relaxed,
                    );
                    return;
                }
            } else {
                let _ = self.tail.compare_exchange(
                    tail,
                    pack_tagged(tail_tag.wrapping_add(1), next_index),
                    Ordering::Release,
                    Ordering::Relaxed,
                );
            }
            backoff.spin();
        }
    }

    /// Records one side of the hand-off and frees the node once both sides are done.
    fn release(&self, index: u32, bit: u8) {
        let previous = self.node(index).handoff.fetch_or(bit, Ordering::AcqRel);
        if previous | bit == RELEASED {
            // SAFETY: both the payload owner and the retiring dequeuer are done
            // with the node, and it is no longer reachable from `head`.
            let handle = unsafe { self.nodes.from_raw(NODE_CATEGORY, index) };
            self.nodes.deallocate(handle);
        }
    }

    #[inline]
    fn node(&self, index: u32) -> &QueueNode<T> {
        // SAFETY: every index stored in head, tail or a link was allocated from
        // `nodes`, whose blocks stay in place until the queue is dropped. Only
        // atomics and claimed payloads are accessed through this reference.
        unsafe { self.nodes.get_raw(NODE_CATEGORY, index) }
    }

    /// Waits a little before the next retry. Returns `false` once the deadline passed.
    fn pause(&self, backoff: &Backoff, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        if backoff.is_completed() {
            std::thread::sleep(self.poll_interval.min(deadline - now));
        } else {
            backoff.snooze();
        }
        true
    }
}

impl<T: Send> Drop for ConcurrentQueue<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}
