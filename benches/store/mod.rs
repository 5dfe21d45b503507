use criterion::{BenchmarkId, Criterion, Throughput};
use marketcore_rs::config::StoreConfig;
use marketcore_rs::{MarketDataStore, MarketUpdate};
use std::hint::black_box;
use std::sync::Arc;

const UPDATES_PER_THREAD: u64 = 5_000;

fn store_with_symbols(symbols: &[String]) -> Arc<MarketDataStore> {
    let store = Arc::new(MarketDataStore::new(StoreConfig::default()).expect("store"));
    for symbol in symbols {
        store.subscribe(symbol, Arc::new(|update: &MarketUpdate| {
            black_box(update.volume);
        }));
    }
    store
}

/// Register all benchmarks for the market data store.
pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("MarketDataStore");

    let symbols = vec!["AAPL".to_string()];
    let store = store_with_symbols(&symbols);
    let mut tick = 0u64;
    group.bench_function("process_update", |b| {
        b.iter(|| {
            tick += 1;
            let offset = (tick % 10) as f64 * 0.01;
            let update = MarketUpdate::new("AAPL", "NASDAQ", 150.0 - offset, 150.1 + offset, 100, tick);
            store.process_update(black_box(&update));
        })
    });

    group.bench_function("get_book", |b| b.iter(|| black_box(store.get_book("AAPL"))));

    // Threads either share one symbol or each own a symbol.
    for &shared in &[true, false] {
        let label = if shared { "one_symbol" } else { "symbol_per_thread" };
        group.throughput(Throughput::Elements(4 * UPDATES_PER_THREAD));
        group.bench_with_input(BenchmarkId::new("four_threads", label), &shared, |b, &shared| {
            let symbols: Vec<String> = (0..4).map(|i| format!("SYM{i}")).collect();
            let store = store_with_symbols(&symbols);
            b.iter(|| {
                std::thread::scope(|scope| {
                    for t in 0..4 {
                        let store = Arc::clone(&store);
                        let symbol = if shared { symbols[0].clone() } else { symbols[t].clone() };
                        scope.spawn(move || {
                            for i in 0..UPDATES_PER_THREAD {
                                let price = 100.0 + (i % 20) as f64;
                                let update =
                                    MarketUpdate::new(symbol.as_str(), "NASDAQ", price, price + 0.5, 10, i);
                                store.process_update(&update);
                            }
                        });
                    }
                });
            })
        });
    }

    group.finish();
}
