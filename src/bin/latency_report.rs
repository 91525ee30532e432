use hdrhistogram::Histogram;
use std::time::Instant;
use tickmatch::{OrderBook, OrderType, Side};

fn main() {
    println!("Preparing latency benchmark...");

    let mut book = OrderBook::new();
    book.warm();

    let mut histogram = Histogram::<u64>::new_with_bounds(1, 100_000, 3).unwrap();

    const ITERATIONS: u64 = 1_000_000;
    const WARMUP: u64 = 10_000;

    // Spread submissions across 100 price points on both sides so the run
    // mixes resting, crossing, and level churn.
    let side_of = |i: u64| if i % 2 == 0 { Side::Buy } else { Side::Sell };
    let price_of = |i: u64| {
        let offset = (i % 100) as i64;
        match side_of(i) {
            Side::Buy => 9_950 + offset,
            Side::Sell => 10_050 - offset,
        }
    };

    println!("Warming up branch predictor ({WARMUP} ops)...");
    for i in 0..WARMUP {
        let _ = std::hint::black_box(book.submit(price_of(i), 10, side_of(i), OrderType::Limit));
    }

    println!("Running {ITERATIONS} iterations...");

    let mut total_duration = std::time::Duration::new(0, 0);

    for i in WARMUP..WARMUP + ITERATIONS {
        let price = price_of(i);
        let side = side_of(i);

        let start = Instant::now();
        let result = std::hint::black_box(book.submit(price, 10, side, OrderType::Limit));
        let elapsed = start.elapsed();

        histogram.record(elapsed.as_nanos() as u64).unwrap_or(());
        total_duration += elapsed;

        // Cancel every fourth resting order to keep pool churn realistic
        if let Ok(id) = result {
            if i % 4 == 0 {
                book.cancel(id);
            }
        }
    }

    println!("\n=== Latency Report (ns) ===");
    println!("Total Ops:  {ITERATIONS}");
    println!(
        "Throughput: {:.2} ops/sec",
        ITERATIONS as f64 / total_duration.as_secs_f64()
    );
    println!("---------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:6} ns", histogram.max());
    println!("---------------------------");

    println!("\nDistribution:");
    for v in histogram.iter_log(100_000, 2.0) {
        let count = v.count_at_value();
        if count > 0 {
            println!("<= {:6} ns: {:10} count", v.value_iterated_to(), count);
        }
    }

    println!("\nFinal book: {} resting orders", book.order_count());
}
