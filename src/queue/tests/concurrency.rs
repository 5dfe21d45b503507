#[cfg(test)]
mod tests {
    use crate::queue::ConcurrentQueue;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const ITEMS_PER_PRODUCER: usize = 5_000;

    #[test]
    fn test_no_loss_or_duplication_across_threads() {
        // Small capacity forces producers to see a full queue and retry.
        let queue = ConcurrentQueue::new(64).expect("queue");
        let producers_done = AtomicUsize::new(0);

        let consumed: Vec<Vec<(usize, usize)>> = thread::scope(|scope| {
            for p in 0..PRODUCERS {
                let queue = &queue;
                let producers_done = &producers_done;
                scope.spawn(move || {
                    for seq in 0..ITEMS_PER_PRODUCER {
                        let mut item = (p, seq);
                        while let Err(back) = queue.enqueue(item) {
                            item = back;
                            thread::yield_now();
                        }
                    }
                    producers_done.fetch_add(1, Ordering::SeqCst);
                });
            }

            let consumers: Vec<_> = (0..CONSUMERS)
                .map(|_| {
                    let queue = &queue;
                    let producers_done = &producers_done;
                    scope.spawn(move || {
                        let mut seen = Vec::new();
                        loop {
                            match queue.try_dequeue(Duration::from_millis(1)) {
                                Some(item) => seen.push(item),
                                None if producers_done.load(Ordering::SeqCst) == PRODUCERS
                                    && queue.is_empty() =>
                                {
                                    break;
                                }
                                None => {}
                            }
                        }
                        seen
                    })
                })
                .collect();

            consumers
                .into_iter()
                .map(|c| c.join().expect("consumer panicked"))
                .collect()
        });

        let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
        for item in consumed.iter().flatten() {
            *counts.entry(*item).or_default() += 1;
        }
        assert_eq!(counts.len(), PRODUCERS * ITEMS_PER_PRODUCER);
        assert!(counts.values().all(|&n| n == 1));

        // Each consumer sees every producer's items in production order.
        for seen in &consumed {
            let mut last: HashMap<usize, usize> = HashMap::new();
            for &(p, seq) in seen {
                if let Some(prev) = last.insert(p, seq) {
                    assert!(seq > prev, "producer {p} reordered: {prev} then {seq}");
                }
            }
        }
        assert!(queue.is_empty());
        assert_eq!(queue.stats().dequeued, (PRODUCERS * ITEMS_PER_PRODUCER) as u64);
    }

    #[test]
    fn test_bulk_calls_interleave_without_loss() {
        let queue = ConcurrentQueue::new(1_024).expect("queue");
        let batch: Vec<u32> = (0..100).collect();

        let drained: Vec<u32> = thread::scope(|scope| {
            for _ in 0..4 {
                let queue = &queue;
                let batch = &batch;
                scope.spawn(move || {
                    for _ in 0..2 {
                        assert_eq!(queue.bulk_enqueue(batch), batch.len());
                    }
                });
            }
            let consumer = scope.spawn(|| {
                let mut drained = Vec::new();
                while drained.len() < 800 {
                    drained.extend(queue.bulk_dequeue(32));
                    thread::yield_now();
                }
                drained
            });
            consumer.join().expect("consumer panicked")
        });

        let mut counts = [0usize; 100];
        for value in drained {
            counts[value as usize] += 1;
        }
        assert!(counts.iter().all(|&n| n == 8));
    }
}
