use marketcore_rs::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_to_pool_pipeline() {
        setup_logger();
        let store = Arc::new(MarketDataStore::new(StoreConfig::default()).expect("store"));
        let pool = Arc::new(WorkerPool::new(PoolConfig::fixed(2)).expect("pool"));
        let volume = Arc::new(AtomicU64::new(0));

        for symbol in ["AAPL", "MSFT", "GOOG"] {
            let pool = Arc::clone(&pool);
            let volume = Arc::clone(&volume);
            let subscribed = store.subscribe(
                symbol,
                Arc::new(move |update: &MarketUpdate| {
                    let volume = Arc::clone(&volume);
                    let size = update.volume;
                    let _ = pool.submit(TaskPriority::High, move || {
                        volume.fetch_add(size, Ordering::SeqCst);
                    });
                }),
            );
            assert!(subscribed);
        }
        assert!(store.add_source("NASDAQ"));
        assert!(store.add_source("NYSE"));

        let runner = store.start_sources().expect("sources");
        let producers: Vec<_> = ["NASDAQ", "NYSE"]
            .into_iter()
            .map(|source| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..300u64 {
                        let symbol = ["AAPL", "MSFT", "GOOG", "ZZZZ"][(i % 4) as usize];
                        let price = 100.0 + (i % 7) as f64;
                        let mut update = MarketUpdate::new(symbol, source, price, price + 0.25, 1, i)
                            .with_last_price(price);
                        while let Err(back) = store.publish(update) {
                            update = back;
                            std::thread::yield_now();
                        }
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("producer");
        }

        assert_eq!(runner.stop(), 600);
        assert!(pool.wait_idle(Duration::from_secs(10)));

        let metrics = store.get_metrics();
        assert_eq!(metrics.total_updates_processed, 450);
        assert_eq!(metrics.total_updates_dropped, 150);
        assert_eq!(volume.load(Ordering::SeqCst), 450);
        assert_eq!(pool.stats().tasks_completed, 450);

        let book = store.get_book("AAPL");
        assert!(book.bids.windows(2).all(|w| w[0].price > w[1].price));
        assert!(book.asks.windows(2).all(|w| w[0].price < w[1].price));
        pool.shutdown();
    }

    #[test]
    fn test_core_error_collects_component_failures() {
        fn build() -> Result<(), CoreError> {
            let config = CoreConfig::from_json_str(r#"{ "queue": { "capacity": 0 } }"#)?;
            let _queue: ConcurrentQueue<u64> = ConcurrentQueue::with_config(config.queue)?;
            Ok(())
        }
        let err = build().expect_err("zero capacity");
        assert!(matches!(err, CoreError::Config(_) | CoreError::Queue(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tasks_can_be_awaited_from_async_code() {
        let pool = WorkerPool::new(PoolConfig::fixed(2)).expect("pool");
        let store = Arc::new(MarketDataStore::new(StoreConfig::default()).expect("store"));
        store.subscribe("BTC-USD", Arc::new(|_update: &MarketUpdate| {}));

        let handles: Vec<_> = (0..10u64)
            .map(|i| {
                let store = Arc::clone(&store);
                pool.submit(TaskPriority::Medium, move || {
                    store.process_update(&MarketUpdate::new(
                        "BTC-USD",
                        "COINBASE",
                        60_000.0 - i as f64,
                        60_001.0 + i as f64,
                        2,
                        i,
                    ));
                    i
                })
                .expect("submit")
            })
            .collect();

        let mut sum = 0;
        for handle in handles {
            sum += handle.await.expect("task result");
        }
        assert_eq!(sum, 45);
        assert_eq!(store.get_book("BTC-USD").bids.len(), 10);
        assert_eq!(store.get_metrics().updates_by_source.get("COINBASE"), Some(&10));
    }
}
