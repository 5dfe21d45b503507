use criterion::{BenchmarkId, Criterion, Throughput};
use crossbeam::queue::ArrayQueue;
use marketcore_rs::ConcurrentQueue;
use std::hint::black_box;
use std::sync::Arc;

const ITEMS_PER_PRODUCER: u64 = 10_000;

/// Register all benchmarks for the lock-free queue.
pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("ConcurrentQueue");

    let queue = ConcurrentQueue::new(1024).expect("queue");
    group.bench_function("enqueue_dequeue", |b| {
        b.iter(|| {
            let _ = queue.enqueue(black_box(42u64));
            black_box(queue.dequeue());
        })
    });

    let baseline = ArrayQueue::new(1024);
    group.bench_function("crossbeam_array_queue_baseline", |b| {
        b.iter(|| {
            let _ = baseline.push(black_box(42u64));
            black_box(baseline.pop());
        })
    });

    group.bench_function("bulk_64", |b| {
        let items: Vec<u64> = (0..64).collect();
        b.iter(|| {
            let pushed = queue.bulk_enqueue(&items);
            black_box(queue.bulk_dequeue(pushed));
        })
    });

    for &threads in &[1usize, 2, 4] {
        group.throughput(Throughput::Elements(threads as u64 * ITEMS_PER_PRODUCER));
        group.bench_with_input(BenchmarkId::new("mpmc", threads), &threads, |b, &threads| {
            let queue: Arc<ConcurrentQueue<u64>> =
                Arc::new(ConcurrentQueue::new(4096).expect("queue"));
            b.iter(|| {
                std::thread::scope(|scope| {
                    for _ in 0..threads {
                        let queue = Arc::clone(&queue);
                        scope.spawn(move || {
                            for i in 0..ITEMS_PER_PRODUCER {
                                let mut item = i;
                                while let Err(back) = queue.enqueue(item) {
                                    item = back;
                                    std::hint::spin_loop();
                                }
                            }
                        });
                        let queue = Arc::clone(&queue);
                        scope.spawn(move || {
                            let mut received = 0;
                            while received < ITEMS_PER_PRODUCER {
                                if queue.dequeue().is_some() {
                                    received += 1;
                                } else {
                                    std::hint::spin_loop();
                                }
                            }
                        });
                    }
                });
            })
        });
    }

    group.finish();
}
