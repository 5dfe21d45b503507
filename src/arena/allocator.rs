//! Segmented free-list allocator with one lock-free free list per category.

use super::block::{
    BlockHandle, MAX_SEGMENT_LEN, MAX_SEGMENTS, MemoryBlock, NULL_INDEX, compose_index,
    pack_tagged, split_index, unpack_tagged,
};
use super::category::CategoryId;
use super::error::ArenaError;
use super::stats::{AllocationStats, AllocationStatsSnapshot};
use crate::config::ArenaConfig;
use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, trace, warn};

static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(1);

/// Storage and free list of a single category.
struct CategoryPool<T> {
    /// Tagged `(tag, index)` head of the free list
    head: CachePadded<AtomicU64>,
    free_count: AtomicUsize,
    capacity: AtomicUsize,
    segment_count: AtomicUsize,
    segments: Box<[OnceLock<Box<[MemoryBlock<T>]>>]>,
    /// Serializes growth only. Never taken by allocate/deallocate on a non-empty list.
    growth: Mutex<()>,
    stats: AllocationStats,
}

impl<T> CategoryPool<T> {
    fn new() -> Self {
        Self {
            head: CachePadded::new(AtomicU64::new(pack_tagged(0, NULL_INDEX))),
            free_count: AtomicUsize::new(0),
            capacity: AtomicUsize::new(0),
            segment_count: AtomicUsize::new(0),
            segments: (0..MAX_SEGMENTS).map(|_| OnceLock::new()).collect(),
            growth: Mutex::new(()),
            stats: AllocationStats::default(),
        }
    }

    #[inline]
    fn block(&self, index: u32) -> Option<&MemoryBlock<T>> {
        let (segment, offset) = split_index(index);
        self.segments.get(segment)?.get()?.get(offset)
    }

    /// Pops the most recently freed block.
    fn pop(&self) -> Option<u32> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            let (tag, index) = unpack_tagged(head);
            let block = self.block(index)?;
            // A stale `next` is harmless: the tag makes the CAS below fail.
            let next = block.next_free.load(Ordering::Relaxed);
            match self.head.compare_exchange_weak(
                head,
                pack_tagged(tag.wrapping_add(1), next),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.free_count.fetch_sub(1, Ordering::Relaxed);
                    return Some(index);
                }
                Err(actual) => head = actual,
            }
        }
    }

    /// Pushes the chain `first ..= last` (already linked through `next_free`).
    fn push_chain(&self, first: u32, last: &MemoryBlock<T>, len: usize) {
        // Counted before the block becomes poppable so the count never underflows.
        self.free_count.fetch_add(len, Ordering::Relaxed);
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            let (tag, head_index) = unpack_tagged(head);
            last.next_free.store(head_index, Ordering::Relaxed);
            match self.head.compare_exchange_weak(
                head,
                pack_tagged(tag.wrapping_add(1), first),
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => head = actual,
            }
        }
    }
}

impl<T: Default> CategoryPool<T> {
    /// Carves `blocks` new blocks into fresh segments and publishes them on the
    /// free list. Must be called with the growth lock held.
    fn carve(&self, mut blocks: usize) -> Result<(), String> {
        while blocks > 0 {
            let len = blocks.min(MAX_SEGMENT_LEN);
            let segment = self.segment_count.load(Ordering::Relaxed);
            if segment >= MAX_SEGMENTS {
                return Err(format!("all {MAX_SEGMENTS} segment slots are in use"));
            }

            let mut storage: Vec<MemoryBlock<T>> = Vec::new();
            storage
                .try_reserve_exact(len)
                .map_err(|e| format!("heap refused {len} blocks: {e}"))?;
            storage.extend((0..len).map(|_| MemoryBlock::default()));
            for (offset, block) in storage.iter_mut().enumerate().take(len - 1) {
                *block.next_free.get_mut() = compose_index(segment, offset + 1);
            }

            if self.segments[segment].set(storage.into_boxed_slice()).is_err() {
                return Err(format!("segment slot {segment} is already populated"));
            }
            self.segment_count.store(segment + 1, Ordering::Relaxed);
            self.capacity.fetch_add(len, Ordering::Relaxed);

            let first = compose_index(segment, 0);
            match self.block(compose_index(segment, len - 1)) {
                Some(last) => self.push_chain(first, last, len),
                None => return Err(format!("segment {segment} vanished after install")),
            }
            blocks -= len;
        }
        Ok(())
    }
}

/// Cache-line aware object arena.
///
/// Every category owns an independent Treiber-stack free list whose head is a
/// tagged index updated by compare-and-swap, so allocation and deallocation on a
/// warm list never take a lock. When a list runs dry the category grows by
/// [`ArenaConfig::growth_batch`] blocks in a new segment; existing blocks never
/// move, which keeps every handed out reference valid for the arena's lifetime.
///
/// # Examples
///
/// ```rust
/// use marketcore_rs::arena::{Arena, CategoryId};
/// use marketcore_rs::config::ArenaConfig;
///
/// let arena: Arena<u64> = Arena::new(2, ArenaConfig::default().with_initial_blocks(8)).unwrap();
/// let mut handle = arena.allocate_with(CategoryId(1), 42).unwrap();
/// *arena.get_mut(&mut handle) += 1;
/// assert_eq!(arena.take(handle), 43);
/// assert_eq!(arena.available(CategoryId(1)), 8);
/// ```
pub struct Arena<T> {
    id: u64,
    config: ArenaConfig,
    pools: Box<[CategoryPool<T>]>,
}

impl<T> std::fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.id)
            .field("categories", &self.pools.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<T: Default> Arena<T> {
    /// Creates an arena with `categories` free lists and preallocates
    /// `initial_blocks_per_category` blocks for each of them.
    pub fn new(categories: usize, config: ArenaConfig) -> Result<Self, ArenaError> {
        if categories == 0 || categories > u16::MAX as usize {
            return Err(ArenaError::InvalidConfig {
                message: format!("category count must be in 1..={}, got {categories}", u16::MAX),
            });
        }
        config.validate().map_err(|e| ArenaError::InvalidConfig {
            message: e.to_string(),
        })?;

        let pools: Box<[CategoryPool<T>]> = (0..categories).map(|_| CategoryPool::new()).collect();
        for (index, pool) in pools.iter().enumerate() {
            let _guard = pool.growth.lock();
            pool.carve(config.initial_blocks_per_category)
                .map_err(|reason| ArenaError::Exhausted {
                    category: CategoryId(index as u16),
                    reason,
                })?;
        }

        let id = NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            arena = id,
            categories,
            initial_blocks = config.initial_blocks_per_category,
            block_size = std::mem::size_of::<MemoryBlock<T>>(),
            "arena created"
        );
        Ok(Self { id, config, pools })
    }

    /// Allocates a block and resets its value to `T::default()`.
    pub fn allocate(&self, category: CategoryId) -> Result<BlockHandle, ArenaError> {
        let mut handle = self.allocate_in_place(category)?;
        *self.get_mut(&mut handle) = T::default();
        Ok(handle)
    }

    /// Allocates a block and moves `value` into it.
    pub fn allocate_with(&self, category: CategoryId, value: T) -> Result<BlockHandle, ArenaError> {
        let mut handle = self.allocate_in_place(category)?;
        *self.get_mut(&mut handle) = value;
        Ok(handle)
    }

    /// Pops a block without touching the value its previous holder left behind.
    pub(crate) fn allocate_in_place(&self, category: CategoryId) -> Result<BlockHandle, ArenaError> {
        let pool = self.pool(category)?;
        let start = Instant::now();
        loop {
            if let Some(index) = pool.pop() {
                let elapsed = start.elapsed().as_nanos() as u64;
                pool.stats
                    .record_allocation(std::mem::size_of::<MemoryBlock<T>>() as u64, elapsed);
                return Ok(BlockHandle {
                    arena_id: self.id,
                    category,
                    index,
                });
            }
            self.grow_on_demand(category, pool)?;
        }
    }

    /// Allocates up to `count` blocks. Stops at the first failure, so the
    /// result may be shorter than requested; failures are counted in the stats.
    pub fn bulk_allocate(&self, category: CategoryId, count: usize) -> Vec<BlockHandle> {
        let mut handles = Vec::with_capacity(count);
        for _ in 0..count {
            match self.allocate(category) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    warn!(
                        arena = self.id,
                        %category,
                        requested = count,
                        allocated = handles.len(),
                        error = %err,
                        "bulk allocation stopped early"
                    );
                    break;
                }
            }
        }
        handles
    }

    /// Moves out the value of a block and returns the block to its free list.
    pub fn take(&self, mut handle: BlockHandle) -> T {
        let value = std::mem::take(self.get_mut(&mut handle));
        self.deallocate(handle);
        value
    }

    /// Grows `category` by exactly `additional` blocks.
    pub fn reserve(&self, category: CategoryId, additional: usize) -> Result<(), ArenaError> {
        let pool = self.pool(category)?;
        if additional == 0 {
            return Ok(());
        }
        let _guard = pool.growth.lock();
        if let Some(max) = self.config.max_blocks_per_category {
            let capacity = pool.capacity.load(Ordering::Relaxed);
            if capacity + additional > max {
                return Err(self.exhausted(
                    category,
                    pool,
                    format!("reserving {additional} blocks would exceed the limit of {max}"),
                ));
            }
        }
        pool.carve(additional)
            .map_err(|reason| self.exhausted(category, pool, reason))?;
        pool.stats.record_growth();
        debug!(arena = self.id, %category, additional, "arena category reserved");
        Ok(())
    }

    #[cold]
    fn grow_on_demand(&self, category: CategoryId, pool: &CategoryPool<T>) -> Result<(), ArenaError> {
        let _guard = pool.growth.lock();
        // Another thread may have grown the list while we waited for the lock.
        if pool.free_count.load(Ordering::Acquire) > 0 {
            return Ok(());
        }
        let capacity = pool.capacity.load(Ordering::Relaxed);
        let mut batch = self.config.growth_batch;
        // Past half of the segment slots every growth at least doubles the
        // category, so the slots cannot run out before memory does.
        if pool.segment_count.load(Ordering::Relaxed) >= MAX_SEGMENTS / 2 {
            batch = batch.max(capacity);
        }
        let batch = match self.config.max_blocks_per_category {
            Some(max) if capacity >= max => {
                return Err(self.exhausted(
                    category,
                    pool,
                    format!("block limit of {max} reached"),
                ));
            }
            Some(max) => batch.min(max - capacity),
            None => batch,
        };
        pool.carve(batch)
            .map_err(|reason| self.exhausted(category, pool, reason))?;
        pool.stats.record_growth();
        debug!(
            arena = self.id,
            %category,
            batch,
            capacity = capacity + batch,
            "arena category grew"
        );
        Ok(())
    }
}

impl<T> Arena<T> {
    /// Returns a block to its category's free list.
    ///
    /// The value is left in place and dropped when the block is reused or the
    /// arena is dropped.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by a different arena.
    pub fn deallocate(&self, handle: BlockHandle) {
        self.check_owner(&handle);
        let pool = &self.pools[handle.category.index()];
        if let Some(block) = pool.block(handle.index) {
            pool.push_chain(handle.index, block, 1);
            pool.stats.record_deallocation();
        }
    }

    /// Returns every handle to its free list.
    pub fn bulk_deallocate(&self, handles: Vec<BlockHandle>) {
        for handle in handles {
            self.deallocate(handle);
        }
    }

    /// Approximate number of free blocks in `category`; 0 for unknown categories.
    pub fn available(&self, category: CategoryId) -> usize {
        self.pools
            .get(category.index())
            .map_or(0, |pool| pool.free_count.load(Ordering::Relaxed))
    }

    /// Number of blocks ever carved for `category`; 0 for unknown categories.
    pub fn capacity(&self, category: CategoryId) -> usize {
        self.pools
            .get(category.index())
            .map_or(0, |pool| pool.capacity.load(Ordering::Relaxed))
    }

    /// Number of categories the arena was built with.
    pub fn categories(&self) -> usize {
        self.pools.len()
    }

    /// Settings the arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Statistics of one category; all zeroes for unknown categories.
    pub fn stats(&self, category: CategoryId) -> AllocationStatsSnapshot {
        self.pools
            .get(category.index())
            .map(|pool| pool.stats.snapshot())
            .unwrap_or_default()
    }

    /// Clears the statistics of one category.
    pub fn reset_stats(&self, category: CategoryId) {
        if let Some(pool) = self.pools.get(category.index()) {
            pool.stats.reset();
            trace!(arena = self.id, %category, "allocation stats reset");
        }
    }

    /// Shared access to a block's value.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by a different arena.
    pub fn get<'a>(&'a self, handle: &'a BlockHandle) -> &'a T {
        self.check_owner(handle);
        // SAFETY: the handle proves the block is allocated and nobody else can
        // obtain `&mut` to it while `handle` is borrowed.
        unsafe { &*self.block_of(handle.category, handle.index).value.get() }
    }

    /// Exclusive access to a block's value.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by a different arena.
    pub fn get_mut<'a>(&'a self, handle: &'a mut BlockHandle) -> &'a mut T {
        self.check_owner(handle);
        // SAFETY: handles are unique, so the exclusive borrow of `handle` is an
        // exclusive borrow of the block.
        unsafe { &mut *self.block_of(handle.category, handle.index).value.get() }
    }

    /// Rebuilds a handle from a raw index.
    ///
    /// # Safety
    ///
    /// `index` must come from [`BlockHandle::into_raw`] on a handle of this arena and
    /// `category`, and no other handle for the block may exist.
    pub unsafe fn from_raw(&self, category: CategoryId, index: u32) -> BlockHandle {
        BlockHandle {
            arena_id: self.id,
            category,
            index,
        }
    }

    /// Shared access to a block by raw index.
    ///
    /// # Safety
    ///
    /// `index` must name a block carved for `category` in this arena, and no
    /// `&mut T` to that block may be live for the returned lifetime.
    pub unsafe fn get_raw(&self, category: CategoryId, index: u32) -> &T
    where
        T: Sync,
    {
        unsafe { &*self.block_of(category, index).value.get() }
    }

    fn pool(&self, category: CategoryId) -> Result<&CategoryPool<T>, ArenaError> {
        self.pools
            .get(category.index())
            .ok_or(ArenaError::InvalidCategory {
                category,
                categories: self.pools.len(),
            })
    }

    #[inline]
    fn block_of(&self, category: CategoryId, index: u32) -> &MemoryBlock<T> {
        match self
            .pools
            .get(category.index())
            .and_then(|pool| pool.block(index))
        {
            Some(block) => block,
            None => panic!("block {index} of category {category} does not exist in arena {}", self.id),
        }
    }

    #[inline]
    fn check_owner(&self, handle: &BlockHandle) {
        assert_eq!(
            handle.arena_id, self.id,
            "block handle belongs to arena {}, not arena {}",
            handle.arena_id, self.id
        );
    }

    #[cold]
    fn exhausted(&self, category: CategoryId, pool: &CategoryPool<T>, reason: String) -> ArenaError {
        pool.stats.record_failure();
        warn!(arena = self.id, %category, %reason, "arena exhausted");
        ArenaError::Exhausted { category, reason }
    }
}
