//! Queue nodes stored in arena blocks.

use crate::arena::{NULL_INDEX, pack_tagged};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU8, AtomicU64};

/// Set by the dequeuer that moved the payload out of the node.
pub(crate) const TAKEN: u8 = 0b01;
/// Set by the dequeuer that moved `head` past the node.
pub(crate) const RETIRED: u8 = 0b10;
/// Both parties are done with the node and it may go back to the arena.
pub(crate) const RELEASED: u8 = TAKEN | RETIRED;

/// One queue element. Lives inside an arena `MemoryBlock`, so it starts on a
/// cache line boundary.
pub(crate) struct QueueNode<T> {
    /// Tagged `(tag, index)` link to the successor
    pub(crate) next: AtomicU64,
    pub(crate) handoff: AtomicU8,
    pub(crate) value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for QueueNode<T> {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(pack_tagged(0, NULL_INDEX)),
            handoff: AtomicU8::new(0),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

// SAFETY: `value` is written only by the enqueuer before the node is linked and
// read only by the single dequeuer whose head CAS claimed it. Every other field
// is atomic.
unsafe impl<T: Send> Sync for QueueNode<T> {}
