use criterion::{BenchmarkId, Criterion};
use marketcore_rs::config::ArenaConfig;
use marketcore_rs::{Arena, CategoryId};
use std::hint::black_box;
use std::sync::Arc;

const CATEGORY: CategoryId = CategoryId(0);

#[derive(Default)]
struct Order {
    id: u64,
    price: u64,
    quantity: u64,
}

/// Register all benchmarks for the block arena.
pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("Arena");

    let arena: Arena<Order> = Arena::new(1, ArenaConfig::default()).expect("arena");
    group.bench_function("allocate_deallocate", |b| {
        b.iter(|| {
            let handle = arena
                .allocate_with(CATEGORY, Order { id: 1, price: 100, quantity: 10 })
                .expect("allocation");
            black_box(arena.get(&handle).price);
            arena.deallocate(handle);
        })
    });

    group.bench_function("box_baseline", |b| {
        b.iter(|| {
            let order = Box::new(Order { id: 1, price: 100, quantity: 10 });
            black_box(order.quantity + order.id);
        })
    });

    for &count in &[16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::new("bulk_allocate", count), &count, |b, &count| {
            b.iter(|| {
                let handles = arena.bulk_allocate(CATEGORY, count);
                black_box(handles.len());
                arena.bulk_deallocate(handles);
            })
        });
    }

    for &threads in &[2usize, 4] {
        group.bench_with_input(
            BenchmarkId::new("contended_allocate", threads),
            &threads,
            |b, &threads| {
                let arena: Arc<Arena<Order>> =
                    Arc::new(Arena::new(1, ArenaConfig::default()).expect("arena"));
                b.iter(|| {
                    std::thread::scope(|scope| {
                        for _ in 0..threads {
                            let arena = Arc::clone(&arena);
                            scope.spawn(move || {
                                for _ in 0..1_000 {
                                    let handle = arena.allocate(CATEGORY).expect("allocation");
                                    arena.deallocate(handle);
                                }
                            });
                        }
                    });
                })
            },
        );
    }

    group.finish();
}
