use marketcore_rs::config::ArenaConfig;
use marketcore_rs::{Arena, CategoryId, ConcurrentQueue, MarketDataStore, MarketUpdate, StoreConfig};
use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum QueueOp {
    Push(u32),
    Pop,
}

fn queue_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![any::<u32>().prop_map(QueueOp::Push), Just(QueueOp::Pop)]
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_queue_matches_bounded_fifo_model(
            capacity in 1usize..16,
            ops in proptest::collection::vec(queue_op(), 0..200),
        ) {
            let queue = ConcurrentQueue::new(capacity).expect("queue");
            let mut model = VecDeque::new();
            for op in ops {
                match op {
                    QueueOp::Push(value) => {
                        let accepted = queue.enqueue(value).is_ok();
                        prop_assert_eq!(accepted, model.len() < capacity);
                        if accepted {
                            model.push_back(value);
                        }
                    }
                    QueueOp::Pop => {
                        prop_assert_eq!(queue.dequeue(), model.pop_front());
                    }
                }
                prop_assert_eq!(queue.len(), model.len());
            }
            let remaining = queue.bulk_dequeue(capacity);
            prop_assert_eq!(remaining, model.into_iter().collect::<Vec<_>>());
        }

        #[test]
        fn test_arena_accounting_balances(
            rounds in proptest::collection::vec((1usize..40, 0usize..40), 1..20),
        ) {
            let category = CategoryId(0);
            let arena: Arena<u64> = Arena::new(1, ArenaConfig::default()
                .with_initial_blocks(8)
                .with_growth_batch(8))
                .expect("arena");
            let mut live = Vec::new();
            let mut last_capacity = arena.capacity(category);
            for (allocate, release) in rounds {
                for i in 0..allocate {
                    let handle = arena.allocate_with(category, i as u64).expect("unbounded arena");
                    live.push(handle);
                }
                for _ in 0..release.min(live.len()) {
                    if let Some(handle) = live.pop() {
                        arena.deallocate(handle);
                    }
                }
                let capacity = arena.capacity(category);
                prop_assert!(capacity >= last_capacity);
                last_capacity = capacity;
                prop_assert_eq!(arena.available(category) + live.len(), capacity);
                prop_assert_eq!(arena.stats(category).current_allocations, live.len() as u64);
            }
        }

        #[test]
        fn test_book_stays_sorted_and_bounded(
            max_depth in 1usize..8,
            quotes in proptest::collection::vec((1u32..50, 1u32..50, 0u64..5), 1..100),
        ) {
            let store = MarketDataStore::new(StoreConfig::default().with_max_depth(max_depth))
                .expect("store");
            store.subscribe("PROP", Arc::new(|_update: &MarketUpdate| {}));
            for (i, (bid, ask, volume)) in quotes.into_iter().enumerate() {
                store.process_update(&MarketUpdate::new(
                    "PROP", "SIM", bid as f64, ask as f64, volume, i as u64,
                ));
            }
            let book = store.get_book("PROP");
            prop_assert!(book.bids.len() <= max_depth);
            prop_assert!(book.asks.len() <= max_depth);
            prop_assert!(book.bids.windows(2).all(|w| w[0].price > w[1].price));
            prop_assert!(book.asks.windows(2).all(|w| w[0].price < w[1].price));
            prop_assert!(book.bids.iter().chain(book.asks.iter()).all(|e| e.size > 0));
        }
    }
}
