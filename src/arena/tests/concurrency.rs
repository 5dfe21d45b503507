#[cfg(test)]
mod tests {
    use crate::arena::{Arena, BlockHandle, CategoryId};
    use crate::config::ArenaConfig;
    use std::collections::HashSet;
    use std::thread;

    const THREADS: usize = 4;
    const OPS_PER_THREAD: usize = 2_000;

    #[test]
    fn test_accounting_holds_under_concurrent_churn() {
        let config = ArenaConfig::default()
            .with_initial_blocks(64)
            .with_growth_batch(32);
        let arena: Arena<u64> = Arena::new(2, config).expect("valid arena");

        let kept: Vec<Vec<BlockHandle>> = thread::scope(|scope| {
            let workers: Vec<_> = (0..THREADS)
                .map(|t| {
                    let arena = &arena;
                    scope.spawn(move || {
                        let category = CategoryId((t % 2) as u16);
                        let mut held: Vec<BlockHandle> = Vec::new();
                        for op in 0..OPS_PER_THREAD {
                            // Allocate twice, free once: the held set keeps growing.
                            if op % 3 == 2 {
                                if let Some(handle) = held.pop() {
                                    arena.deallocate(handle);
                                }
                            } else {
                                let value = (t * OPS_PER_THREAD + op) as u64;
                                held.push(arena.allocate_with(category, value).expect("allocate"));
                            }
                        }
                        held
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|w| w.join().expect("worker panicked"))
                .collect()
        });

        for category in [CategoryId(0), CategoryId(1)] {
            let stats = arena.stats(category);
            let outstanding: usize = kept
                .iter()
                .flatten()
                .filter(|h| h.category() == category)
                .count();
            assert_eq!(
                stats.total_allocations - stats.total_deallocations,
                stats.current_allocations
            );
            assert_eq!(stats.current_allocations as usize, outstanding);
            assert_eq!(
                arena.available(category) + outstanding,
                arena.capacity(category)
            );
        }

        // No block was handed out twice.
        let mut seen = HashSet::new();
        for handle in kept.iter().flatten() {
            assert!(seen.insert((handle.category(), handle.index())));
        }

        for handles in kept {
            arena.bulk_deallocate(handles);
        }
        assert_eq!(arena.stats(CategoryId(0)).current_allocations, 0);
        assert_eq!(arena.stats(CategoryId(1)).current_allocations, 0);
    }

    #[test]
    fn test_values_are_not_shared_between_threads() {
        let arena: Arena<u64> =
            Arena::new(1, ArenaConfig::default().with_initial_blocks(8)).expect("valid arena");

        thread::scope(|scope| {
            for t in 0..THREADS as u64 {
                let arena = &arena;
                scope.spawn(move || {
                    for round in 0..1_000u64 {
                        let mut handle = arena.allocate(CategoryId(0)).expect("allocate");
                        let stamp = t << 32 | round;
                        *arena.get_mut(&mut handle) = stamp;
                        thread::yield_now();
                        assert_eq!(*arena.get(&handle), stamp);
                        arena.deallocate(handle);
                    }
                });
            }
        });

        let stats = arena.stats(CategoryId(0));
        assert_eq!(stats.total_allocations, THREADS as u64 * 1_000);
        assert_eq!(stats.current_allocations, 0);
        assert!(stats.peak_allocations <= THREADS as u64);
    }
}
