//! Enqueue-to-dequeue latency distribution of `ConcurrentQueue`.
//!
//! One producer stamps every item with its send time, one consumer records the
//! hand-over latency in an HDR histogram and prints the percentiles.

use hdrhistogram::Histogram;
use marketcore_rs::ConcurrentQueue;
use std::sync::Arc;
use std::time::{Duration, Instant};

const ITERATIONS: u64 = 1_000_000;

fn main() {
    println!("Preparing queue latency benchmark...");

    let queue: Arc<ConcurrentQueue<Instant>> =
        Arc::new(ConcurrentQueue::new(1024).expect("queue"));
    let mut histogram =
        Histogram::<u64>::new_with_bounds(1, 10_000_000, 3).expect("histogram bounds");

    println!("Running {ITERATIONS} iterations...");
    let started = Instant::now();

    let producer = {
        let queue = Arc::clone(&queue);
        std::thread::spawn(move || {
            for _ in 0..ITERATIONS {
                let mut stamp = Instant::now();
                while let Err(back) = queue.enqueue(stamp) {
                    stamp = back;
                    std::hint::spin_loop();
                }
            }
        })
    };

    let mut received = 0;
    while received < ITERATIONS {
        match queue.dequeue() {
            Some(sent) => {
                let latency = sent.elapsed().as_nanos() as u64;
                // Outliers beyond the histogram range are clamped.
                histogram.saturating_record(latency.max(1));
                received += 1;
            }
            None => std::hint::spin_loop(),
        }
    }
    producer.join().expect("producer thread");
    let total: Duration = started.elapsed();

    let stats = queue.stats();
    println!("\n=== Queue Latency Report (ns) ===");
    println!("Total items: {ITERATIONS}");
    println!(
        "Throughput:  {:.2} items/sec",
        ITERATIONS as f64 / total.as_secs_f64()
    );
    println!("Peak depth:  {}", stats.peak_size);
    println!("Full queue:  {} rejected enqueues", stats.failed_enqueues);
    println!("---------------------------------");
    println!("Min:    {:8} ns", histogram.min());
    println!("P50:    {:8} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:8} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:8} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:8} ns", histogram.value_at_quantile(0.999));
    println!("Max:    {:8} ns", histogram.max());
}
