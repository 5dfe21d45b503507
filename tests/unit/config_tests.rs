use marketcore_rs::config::{CoreConfig, PoolConfig, StoreConfig};
use marketcore_rs::{ConcurrentQueue, MarketDataStore, WorkerPool};
use std::io::Write;
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_build_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{
                "queue": {{ "capacity": 8 }},
                "pool": {{ "initial_threads": 1, "min_threads": 1, "max_threads": 2 }},
                "store": {{ "max_symbols": 2, "max_depth": 3 }}
            }}"#
        )
        .expect("write config");

        let config = CoreConfig::from_json_file(file.path()).expect("config");
        let queue: ConcurrentQueue<u8> =
            ConcurrentQueue::with_config(config.queue.clone()).expect("queue");
        assert_eq!(queue.capacity(), 8);

        let pool = WorkerPool::new(config.pool.clone()).expect("pool");
        assert_eq!(pool.size(), 1);
        pool.shutdown();

        let store = MarketDataStore::new(config.store.clone()).expect("store");
        assert_eq!(store.config().max_depth, 3);
        assert_eq!(config.store.contention_threshold(), Duration::from_micros(100));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = CoreConfig::from_json_file(dir.path().join("absent.json")).expect_err("missing");
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_builders_produce_valid_configs() {
        assert!(PoolConfig::fixed(3).validate().is_ok());
        assert!(
            StoreConfig::default()
                .with_max_symbols(10)
                .with_source_queue_capacity(16)
                .validate()
                .is_ok()
        );
        assert!(StoreConfig::default().with_max_symbols(0).validate().is_err());
    }
}
