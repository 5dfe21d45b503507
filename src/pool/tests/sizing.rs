#[cfg(test)]
mod tests {
    use crate::config::PoolConfig;
    use crate::pool::{PoolError, TaskPriority, WorkerPool};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PoolConfig::default().with_threads(1, 3, 2);
        let err = WorkerPool::new(config).expect_err("min above max");
        assert!(matches!(err, PoolError::InvalidConfig { .. }));
    }

    #[test]
    fn test_grows_under_backlog_up_to_max() {
        let config = PoolConfig::default()
            .with_threads(1, 1, 4)
            .with_growth_threshold(1);
        let pool = WorkerPool::new(config).expect("pool");
        let release = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let release = Arc::clone(&release);
                pool.submit(TaskPriority::Medium, move || {
                    while !release.load(Ordering::Acquire) {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                    i
                })
                .expect("submit")
            })
            .collect();

        assert_eq!(pool.size(), 4);
        assert_eq!(pool.stats().threads_spawned, 4);
        release.store(true, Ordering::Release);
        let results: Vec<i32> = handles
            .into_iter()
            .map(|h| h.wait().expect("task"))
            .collect();
        assert_eq!(results, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_idle_workers_retire_down_to_min() {
        let config = PoolConfig::default()
            .with_threads(3, 1, 3)
            .with_idle_timeout(Duration::from_millis(30));
        let pool = WorkerPool::new(config).expect("pool");
        assert_eq!(pool.size(), 3);

        assert!(eventually(Duration::from_secs(5), || pool.size() == 1));
        // The last worker stays and keeps serving.
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(pool.size(), 1);
        let handle = pool.submit(TaskPriority::High, || "still here").expect("submit");
        assert_eq!(handle.wait(), Ok("still here"));
        assert_eq!(pool.stats().threads_retired, 2);
    }

    #[test]
    fn test_resize_to_zero_finishes_submitted_tasks() {
        let config = PoolConfig::default().with_threads(2, 1, 2);
        let pool = WorkerPool::new(config).expect("pool");

        let handles: Vec<_> = (0..20u32)
            .map(|i| {
                pool.submit(TaskPriority::Medium, move || {
                    std::thread::sleep(Duration::from_millis(1));
                    i * 2
                })
                .expect("submit")
            })
            .collect();
        pool.resize(0).expect("resize");

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.wait(), Ok(i as u32 * 2));
        }
        assert!(eventually(Duration::from_secs(5), || pool.size() == 0));

        // Without workers new tasks wait until the pool is resized again.
        let pending = pool.submit(TaskPriority::Low, || 1).expect("submit");
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(pool.queue_size(), 1);
        assert!(!pool.wait_idle(Duration::from_millis(10)));

        pool.resize(1).expect("resize");
        assert_eq!(pending.wait(), Ok(1));
        assert!(pool.wait_idle(Duration::from_secs(5)));
    }

    #[test]
    fn test_resize_up_is_clamped_to_max() {
        let config = PoolConfig::default().with_threads(1, 1, 4);
        let pool = WorkerPool::new(config).expect("pool");
        pool.resize(3).expect("resize");
        assert_eq!(pool.size(), 3);
        pool.resize(10).expect("resize");
        assert_eq!(pool.size(), 4);

        pool.resize(2).expect("resize");
        assert!(eventually(Duration::from_secs(5), || pool.size() == 2));

        pool.shutdown();
        assert_eq!(pool.resize(2), Err(PoolError::ShuttingDown));
    }
}
