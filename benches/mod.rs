use criterion::{criterion_group, criterion_main};

mod arena;
mod queue;
mod store;

use arena::register_benchmarks as register_arena_benchmarks;
use pool::register_benchmarks as register_pool_benchmarks;
use queue::register_benchmarks as register_queue_benchmarks;
use store::register_benchmarks as register_store_benchmarks;

criterion_group!(
    benches,
    register_arena_benchmarks,
    register_queue_benchmarks,
    register_pool_benchmarks,
    register_store_benchmarks,
);

criterion_main!(benches);
