//! End-to-end benchmark: feed thread -> command ring -> matcher thread.
//!
//! Reports throughput, per-trade latency percentiles from the engine's own
//! log, an HDR histogram of the distribution, and the buy/sell conservation
//! check.

use std::time::Instant;

use hdrhistogram::Histogram;

use tick_lob::{
    Command, Engine, EngineConfig, FeedConfig, FeedHandler, OrderType, RunLimit, SpscRing,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let total_commands: u64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1_000_000);

    let config = EngineConfig::default();
    let mut engine = Engine::new(&config).expect("valid default config");
    engine.pin_to_core();
    engine.warm_up();

    let (mut tx, mut rx) = SpscRing::<Command>::with_capacity(config.ring_capacity);

    let feed = FeedHandler::new(
        FeedConfig {
            total_commands,
            ..Default::default()
        },
        config.price_domain,
    );
    let clock = engine.matcher.clock();

    println!("tick-lob latency report");
    println!("=======================");
    println!("commands: {}", total_commands);

    let start = Instant::now();
    let producer = std::thread::spawn(move || feed.run(&mut tx, clock));
    let processed = engine.run(&mut rx, RunLimit::UntilShutdown);
    producer.join().expect("producer thread");
    let elapsed = start.elapsed();

    let stats = engine.matcher.stats();
    let throughput = processed as f64 / elapsed.as_secs_f64();

    println!("\n=== RUN RESULTS ===");
    println!("run time:         {} ms", elapsed.as_millis());
    println!("commands:         {}", processed);
    println!("throughput:       {:.0} cmd/s", throughput);
    println!("trades executed:  {}", stats.trades_executed);
    println!("orders rejected:  {}", stats.orders_rejected);
    println!("resting orders:   {}", engine.order_count());

    if let Some(p) = engine.matcher.latencies().percentiles() {
        println!("\n=== TRADE LATENCY (ns) ===");
        println!("P50: {}", p.p50);
        println!("P95: {}", p.p95);
        println!("P99: {}", p.p99);
    }

    if !engine.matcher.latencies().is_empty() {
        let mut histogram = Histogram::<u64>::new_with_bounds(1, 10_000_000, 3).unwrap();
        for &sample in engine.matcher.latencies().samples() {
            histogram.record(sample.max(1)).unwrap_or(());
        }

        println!("\n=== DISTRIBUTION ===");
        println!("min:    {:>8} ns", histogram.min());
        println!("p90:    {:>8} ns", histogram.value_at_quantile(0.90));
        println!("p99.9:  {:>8} ns", histogram.value_at_quantile(0.999));
        println!("max:    {:>8} ns", histogram.max());
    }

    println!("\n=== ORDER TYPE STATS ===");
    for (name, order_type) in [
        ("LIMIT", OrderType::Limit),
        ("IOC", OrderType::Ioc),
        ("FOK", OrderType::Fok),
    ] {
        let t = stats.type_stats(order_type);
        println!(
            "{:<6} submitted={} filled={} partial={} cancelled={} rejected={}",
            name, t.submitted, t.filled, t.partial_fills, t.cancelled, t.rejected
        );
    }

    println!("\n=== CORRECTNESS ===");
    println!("buy matched:  {}", stats.total_buy_matched);
    println!("sell matched: {}", stats.total_sell_matched);
    println!(
        "conservation: {}",
        if stats.conservation_holds() { "PASS" } else { "FAIL" }
    );
}
