//! Feed handler - randomized command producer for simulation runs.
//!
//! Generates a market-shaped mix: passive orders placed away from a
//! random-walking mid, aggressive orders crossing it, and cancels drawn
//! from the orders this feed has issued. Prices are clamped into the
//! engine's domain. Back-pressure policy on a full ring is a cooperative
//! yield per failed push.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::clock::MonotonicClock;
use crate::command::{Command, Side};
use crate::config::PriceDomain;
use crate::spsc::Producer;

#[derive(Clone, Debug)]
pub struct FeedConfig {
    /// Commands to generate before the shutdown sentinel.
    pub total_commands: u64,
    /// Fraction of commands that are NEW orders (the rest are cancels).
    pub new_ratio: f64,
    /// Fraction of NEW orders placed passively (away from the mid).
    pub passive_ratio: f64,
    pub min_quantity: u64,
    pub max_quantity: u64,
    /// ChaCha8 seed; a fixed seed reproduces the exact command stream.
    pub seed: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            total_commands: 1_000_000,
            new_ratio: 0.7,
            passive_ratio: 0.5,
            min_quantity: 1,
            max_quantity: 1_000,
            seed: 0x5EED,
        }
    }
}

pub struct FeedHandler {
    config: FeedConfig,
    domain: PriceDomain,
}

impl FeedHandler {
    pub fn new(config: FeedConfig, domain: PriceDomain) -> Self {
        Self { config, domain }
    }

    /// Generate and enqueue the configured command stream, then a shutdown
    /// sentinel. Returns the number of NEW commands produced.
    pub fn run(&self, producer: &mut Producer<Command>, clock: MonotonicClock) -> u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let (min, max) = (self.domain.min(), self.domain.max());
        // Keep the mid a margin away from the edges on wide domains so both
        // sides have room to quote.
        let (mid_lo, mid_hi) = if max - min > 200 {
            (min + 100, max - 100)
        } else {
            (min, max)
        };
        let mut mid = (min + max) / 2;

        let mut next_order_id = 1u64;
        let mut issued: Vec<u64> = Vec::with_capacity(4096);
        let mut news = 0u64;

        for generated in 0..self.config.total_commands {
            let cmd = if issued.is_empty() || rng.gen_bool(self.config.new_ratio) {
                let order_id = next_order_id;
                next_order_id += 1;
                news += 1;
                issued.push(order_id);

                let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
                let quantity = rng.gen_range(self.config.min_quantity..=self.config.max_quantity);
                let offset = rng.gen_range(1..=50i64);

                let price = if rng.gen_bool(self.config.passive_ratio) {
                    // Passive: rest away from the mid.
                    match side {
                        Side::Buy => mid - offset,
                        Side::Sell => mid + offset,
                    }
                } else {
                    // Aggressive: cross the mid.
                    match side {
                        Side::Buy => mid + offset % 20,
                        Side::Sell => mid - offset % 20,
                    }
                };
                let price = price.clamp(min, max);

                Command::limit(order_id, side, price, quantity, clock.now_nanos())
            } else {
                let pick = rng.gen_range(0..issued.len());
                let order_id = issued.swap_remove(pick);
                Command::cancel(order_id, clock.now_nanos())
            };

            Self::push_blocking(producer, cmd);

            // Random walk the mid every so often to move the market.
            if generated % 10_000 == 9_999 {
                mid += rng.gen_range(-10..=10i64);
                mid = mid.clamp(mid_lo, mid_hi);
            }
        }

        Self::push_blocking(producer, Command::Shutdown);
        news
    }

    fn push_blocking(producer: &mut Producer<Command>, cmd: Command) {
        while !producer.try_push(cmd) {
            std::thread::yield_now();
        }
    }
}
