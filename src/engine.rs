//! Engine - the matcher-side run loop over the command ring.
//!
//! Owns a [`MatchingEngine`] and drains a [`Consumer`] endpoint in a tight
//! poll: never yielding while commands are queued, spinning when empty.
//! Termination is cooperative, either a processed-command bound or the
//! shutdown sentinel.

use tracing::info;

use crate::command::Command;
use crate::config::{ConfigError, EngineConfig};
use crate::market_data::{MarketDataPublisher, NullPublisher};
use crate::matching::MatchingEngine;
use crate::spsc::Consumer;

/// When to leave the run loop (a shutdown sentinel always does).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunLimit {
    /// Stop after this many processed commands.
    Commands(u64),
    /// Run until the producer sends [`Command::Shutdown`].
    UntilShutdown,
}

pub struct Engine<P: MarketDataPublisher> {
    pub matcher: MatchingEngine<P>,
}

impl Engine<NullPublisher> {
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        Self::with_publisher(config, NullPublisher)
    }
}

impl<P: MarketDataPublisher> Engine<P> {
    pub fn with_publisher(config: &EngineConfig, publisher: P) -> Result<Self, ConfigError> {
        Ok(Self {
            matcher: MatchingEngine::new(config, publisher)?,
        })
    }

    /// Drain the ring until the limit is reached or a shutdown sentinel is
    /// dequeued. Returns the number of commands processed.
    pub fn run(&mut self, input: &mut Consumer<Command>, limit: RunLimit) -> u64 {
        info!(?limit, "matcher loop started");
        let mut processed = 0u64;

        loop {
            if let Some(cmd) = input.try_pop() {
                if !self.matcher.process(cmd) {
                    break;
                }
                processed += 1;
                if let RunLimit::Commands(n) = limit {
                    if processed >= n {
                        break;
                    }
                }
            } else {
                std::hint::spin_loop();
            }
        }

        info!(processed, "matcher loop stopped");
        processed
    }

    /// Pin the current thread to the last available core, which is the one
    /// most likely isolated from interrupts.
    pub fn pin_to_core(&self) {
        if let Some(core_ids) = core_affinity::get_core_ids() {
            if let Some(last) = core_ids.last() {
                core_affinity::set_for_current(*last);
            }
        }
    }

    /// Pre-fault arena pages before the first command.
    pub fn warm_up(&mut self) {
        self.matcher.warm_up();
    }

    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        self.matcher.best_bid()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        self.matcher.best_ask()
    }

    #[inline]
    pub fn spread(&self) -> Option<i64> {
        self.matcher.spread()
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.matcher.order_count()
    }

    #[inline]
    pub fn state_hash(&self) -> u64 {
        self.matcher.state_hash()
    }
}
