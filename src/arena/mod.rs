//! Cache-line aware block allocator with one lock-free free list per category.
//!
//! An [`Arena`] hands out [`BlockHandle`]s, unique tokens for 64-byte aligned
//! [`MemoryBlock`]s. Freed blocks go back on the front of their category's free
//! list, so the most recently freed (and most likely cached) block is reused
//! first. Lists grow in batches when they run dry; growth is the only path that
//! takes a lock.

mod allocator;
mod block;
mod category;
mod error;
mod stats;
mod tests;

pub use allocator::Arena;
pub use block::{BlockHandle, CACHE_LINE_SIZE, MemoryBlock, NULL_INDEX};
pub(crate) use block::{MAX_SEGMENTS, pack_tagged, unpack_tagged};
pub use category::{CategoryId, OrderCategory};
pub use error::ArenaError;
pub use stats::{AllocationStats, AllocationStatsSnapshot};
