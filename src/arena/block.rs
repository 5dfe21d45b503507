//! Cache-line aligned blocks, block handles and tagged index helpers.

use super::category::CategoryId;
use std::cell::UnsafeCell;
use std::sync::atomic::AtomicU32;

/// Size of a cache line on the targets we care about.
pub const CACHE_LINE_SIZE: usize = 64;

/// Sentinel index meaning "no block" (the null pointer of index-linked lists).
pub const NULL_INDEX: u32 = u32::MAX;

/// Bits of a block index used for the offset inside a segment.
pub(crate) const OFFSET_BITS: u32 = 24;

/// Largest number of blocks a single segment may hold.
pub(crate) const MAX_SEGMENT_LEN: usize = 1 << OFFSET_BITS;

/// Number of segment slots per category. Segment 255 is left unused so that
/// no valid index can collide with [`NULL_INDEX`].
pub(crate) const MAX_SEGMENTS: usize = 255;

const OFFSET_MASK: u32 = (1 << OFFSET_BITS) - 1;

/// One slot of arena storage.
///
/// `next_free` threads the block onto its category's free list while the block
/// is not handed out. The value is only reachable through a [`BlockHandle`] or
/// the unsafe raw-index accessors of the arena.
#[repr(C, align(64))]
pub struct MemoryBlock<T> {
    pub(crate) next_free: AtomicU32,
    pub(crate) value: UnsafeCell<T>,
}

const _: () = assert!(
    std::mem::align_of::<MemoryBlock<u64>>() == CACHE_LINE_SIZE,
    "MemoryBlock must be cache line aligned"
);

const _: () = assert!(
    std::mem::size_of::<MemoryBlock<u64>>() == CACHE_LINE_SIZE,
    "MemoryBlock of a small payload must occupy exactly one cache line"
);

impl<T: Default> Default for MemoryBlock<T> {
    fn default() -> Self {
        Self {
            next_free: AtomicU32::new(NULL_INDEX),
            value: UnsafeCell::new(T::default()),
        }
    }
}

// SAFETY: the value is only mutated through an exclusive `BlockHandle`
// (or by raw-index users that uphold the same exclusivity), and shared
// access hands out `&T`, which requires `T: Sync`.
unsafe impl<T: Send + Sync> Sync for MemoryBlock<T> {}

/// Exclusive token for one allocated block.
///
/// A handle is neither `Clone` nor `Copy`: while it exists no free list can
/// reach its block, and only the holder may obtain `&mut` access to the value.
/// Dropping a handle without deallocating it leaks the block for the lifetime
/// of the arena.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping a BlockHandle leaks its block until the arena is dropped"]
pub struct BlockHandle {
    pub(crate) arena_id: u64,
    pub(crate) category: CategoryId,
    pub(crate) index: u32,
}

impl BlockHandle {
    /// Category the block was allocated from.
    #[inline]
    pub fn category(&self) -> CategoryId {
        self.category
    }

    /// Stable index of the block inside its category.
    ///
    /// Two handles with the same category and index name the same memory,
    /// which is how reuse of a freed block can be observed.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Turns the handle into its bare index, giving up the handle's ownership
    /// tracking. Pair with [`Arena::from_raw`](super::Arena::from_raw) to
    /// deallocate the block later.
    #[inline]
    pub fn into_raw(self) -> u32 {
        self.index
    }
}

/// Builds a block index from a segment number and an offset in that segment.
#[inline]
pub(crate) fn compose_index(segment: usize, offset: usize) -> u32 {
    debug_assert!(segment < MAX_SEGMENTS);
    debug_assert!(offset < MAX_SEGMENT_LEN);
    ((segment as u32) << OFFSET_BITS) | offset as u32
}

/// Splits a block index into `(segment, offset)`.
#[inline]
pub(crate) fn split_index(index: u32) -> (usize, usize) {
    ((index >> OFFSET_BITS) as usize, (index & OFFSET_MASK) as usize)
}

/// Packs a generation tag and an index into one CAS-able word.
#[inline]
pub(crate) fn pack_tagged(tag: u32, index: u32) -> u64 {
    ((tag as u64) << 32) | index as u64
}

/// Unpacks a tagged word into `(tag, index)`.
#[inline]
pub(crate) fn unpack_tagged(word: u64) -> (u32, u32) {
    ((word >> 32) as u32, word as u32)
}
