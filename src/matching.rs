//! Matching engine - the single-threaded command processor.
//!
//! One matcher thread owns the arena, the book, the directory, and the
//! publisher; commands arrive sequentially, so no path in here takes a
//! lock. Crossing walks opposite-side levels from the best price outward
//! and matches FIFO within each level; trades execute at the resting
//! order's price.
//!
//! Every error class is handled locally and is non-fatal: pool exhaustion,
//! out-of-bounds prices, duplicate ids and infeasible FOKs reject the
//! incoming order, and cancels for unknown ids are a silent no-op. The
//! matcher never retries anything; resubmission is the producer's call.

use tracing::{debug, warn};

use crate::arena::{Arena, ArenaIndex, NULL_INDEX};
use crate::book::Book;
use crate::clock::MonotonicClock;
use crate::command::{Command, NewOrder, OrderStatus, OrderType, RejectReason, Side};
use crate::config::{ConfigError, EngineConfig};
use crate::directory::OrderDirectory;
use crate::market_data::{BookSnapshot, LevelUpdate, MarketDataPublisher, TradeEvent};
use crate::stats::{EngineStats, LatencyLog};

pub struct MatchingEngine<P: MarketDataPublisher> {
    arena: Arena,
    book: Book,
    directory: OrderDirectory,
    publisher: P,
    stats: EngineStats,
    latencies: LatencyLog,
    clock: MonotonicClock,
    snapshot_depth: usize,
    pool_warned: bool,
}

impl<P: MarketDataPublisher> MatchingEngine<P> {
    pub fn new(config: &EngineConfig, publisher: P) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            arena: Arena::with_capacity(config.max_orders),
            book: Book::new(config.price_domain),
            directory: OrderDirectory::with_capacity(config.max_orders),
            publisher,
            stats: EngineStats::default(),
            latencies: LatencyLog::with_capacity(4096),
            clock: MonotonicClock::new(),
            snapshot_depth: config.snapshot_depth,
            pool_warned: false,
        })
    }

    /// Handle one command. Returns `false` once a shutdown sentinel is
    /// seen, signalling the run loop to exit.
    pub fn process(&mut self, cmd: Command) -> bool {
        let processing_start = self.clock.now_nanos();
        match cmd {
            Command::New(new) => {
                self.stats.orders_processed += 1;
                self.handle_new(new, processing_start);
                true
            }
            Command::Cancel(cancel) => {
                self.stats.orders_processed += 1;
                self.handle_cancel(cancel.order_id);
                true
            }
            Command::Shutdown => false,
        }
    }

    // ------------------------------------------------------------------
    // NEW handling
    // ------------------------------------------------------------------

    fn handle_new(&mut self, cmd: NewOrder, processing_start: u64) {
        self.stats.type_stats_mut(cmd.order_type).submitted += 1;

        if cmd.quantity == 0 {
            self.reject(cmd.order_id, cmd.order_type, RejectReason::InvalidQuantity);
            return;
        }
        // Out-of-domain prices are rejected here and never indexed.
        if !self.book.domain().contains(cmd.price) {
            self.reject(cmd.order_id, cmd.order_type, RejectReason::PriceOutOfBounds);
            return;
        }
        if self.directory.get(cmd.order_id).is_some() {
            self.reject(cmd.order_id, cmd.order_type, RejectReason::DuplicateOrderId);
            return;
        }

        let Some(index) = self.arena.alloc() else {
            if !self.pool_warned {
                warn!(order_id = cmd.order_id, "order pool exhausted, rejecting");
                self.pool_warned = true;
            }
            self.reject(cmd.order_id, cmd.order_type, RejectReason::PoolExhausted);
            return;
        };

        let node = self.arena.get_mut(index);
        node.order_id = cmd.order_id;
        node.side = cmd.side;
        node.order_type = cmd.order_type;
        node.price = cmd.price;
        node.remaining = cmd.quantity;
        node.original = cmd.quantity;
        node.timestamp = cmd.producer_timestamp;
        node.status = OrderStatus::Pending;

        self.directory.insert(cmd.order_id, index);

        match cmd.order_type {
            OrderType::Limit => self.execute_limit(index, processing_start),
            OrderType::Ioc => self.execute_ioc(index, processing_start),
            OrderType::Fok => self.execute_fok(index, processing_start),
        }
    }

    /// Cross, then book any residue at the limit price.
    fn execute_limit(&mut self, index: ArenaIndex, processing_start: u64) {
        self.cross(index, processing_start);

        let node = self.arena.get(index);
        let (order_id, order_type, side, price) =
            (node.order_id, node.order_type, node.side, node.price);
        let (remaining, original) = (node.remaining, node.original);

        if remaining == 0 {
            self.finish_filled(index, order_id, order_type);
            return;
        }

        let partially_filled = remaining < original;
        let node = self.arena.get_mut(index);
        node.status = if partially_filled {
            OrderStatus::PartialFill
        } else {
            OrderStatus::Pending
        };
        if partially_filled {
            self.stats.type_stats_mut(order_type).partial_fills += 1;
        }

        self.book.insert(&mut self.arena, index);
        self.publish_level_update(side, price);
    }

    /// Cross, then cancel any residue instead of booking it.
    fn execute_ioc(&mut self, index: ArenaIndex, processing_start: u64) {
        self.cross(index, processing_start);

        let node = self.arena.get(index);
        let (order_id, order_type, remaining) = (node.order_id, node.order_type, node.remaining);

        if remaining == 0 {
            self.finish_filled(index, order_id, order_type);
        } else {
            self.arena.get_mut(index).status = OrderStatus::Cancelled;
            self.stats.type_stats_mut(order_type).cancelled += 1;
            self.directory.remove(order_id);
            self.arena.free(index);
        }
    }

    /// Pre-check fillable quantity, then either cross to a guaranteed full
    /// fill or reject without touching the book. The check and the cross
    /// run back to back on this thread, so no command can intervene.
    fn execute_fok(&mut self, index: ArenaIndex, processing_start: u64) {
        let node = self.arena.get(index);
        let (order_id, order_type, side, limit, want) = (
            node.order_id,
            node.order_type,
            node.side,
            node.price,
            node.remaining,
        );

        if self.fillable_quantity(side, limit, want) < want {
            self.arena.get_mut(index).status = OrderStatus::Rejected;
            self.directory.remove(order_id);
            self.arena.free(index);
            self.reject(order_id, order_type, RejectReason::FokInsufficientLiquidity);
            return;
        }

        self.cross(index, processing_start);
        debug_assert_eq!(
            self.arena.get(index).remaining,
            0,
            "pre-checked FOK must fill completely"
        );
        self.finish_filled(index, order_id, order_type);
    }

    /// Resting quantity crossable at the limit, short-circuited at `want`.
    fn fillable_quantity(&self, side: Side, limit: i64, want: u64) -> u64 {
        let mut fillable = 0u64;
        match side {
            Side::Buy => {
                let Some(best) = self.book.best_ask() else {
                    return 0;
                };
                let mut price = best;
                while price <= limit {
                    let (qty, _) = self.book.depth_at(Side::Sell, price);
                    fillable += qty;
                    if fillable >= want {
                        return fillable;
                    }
                    price += 1;
                }
            }
            Side::Sell => {
                let Some(best) = self.book.best_bid() else {
                    return 0;
                };
                let mut price = best;
                while price >= limit {
                    let (qty, _) = self.book.depth_at(Side::Buy, price);
                    fillable += qty;
                    if fillable >= want {
                        return fillable;
                    }
                    price -= 1;
                }
            }
        }
        fillable
    }

    fn finish_filled(&mut self, index: ArenaIndex, order_id: u64, order_type: OrderType) {
        self.arena.get_mut(index).status = OrderStatus::Filled;
        self.stats.type_stats_mut(order_type).filled += 1;
        self.directory.remove(order_id);
        self.arena.free(index);
    }

    fn reject(&mut self, order_id: u64, order_type: OrderType, reason: RejectReason) {
        self.stats.orders_rejected += 1;
        self.stats.type_stats_mut(order_type).rejected += 1;
        debug!(order_id, ?reason, "order rejected");
    }

    // ------------------------------------------------------------------
    // Crossing
    // ------------------------------------------------------------------

    /// Walk opposite-side levels from the best price toward the
    /// aggressor's limit until the limit stops crossing or the aggressor
    /// is exhausted.
    fn cross(&mut self, aggressor: ArenaIndex, processing_start: u64) {
        let node = self.arena.get(aggressor);
        let (side, limit) = (node.side, node.price);

        match side {
            Side::Buy => {
                let Some(best) = self.book.best_ask() else {
                    return;
                };
                let mut price = best;
                while price <= limit {
                    self.match_level(aggressor, Side::Sell, price, processing_start);
                    if self.arena.get(aggressor).remaining == 0 {
                        return;
                    }
                    price += 1;
                }
            }
            Side::Sell => {
                let Some(best) = self.book.best_bid() else {
                    return;
                };
                let mut price = best;
                while price >= limit {
                    self.match_level(aggressor, Side::Buy, price, processing_start);
                    if self.arena.get(aggressor).remaining == 0 {
                        return;
                    }
                    price -= 1;
                }
            }
        }
    }

    /// Match the aggressor against one level's FIFO queue, head first.
    /// Publishes the level update after the level is exhausted or the
    /// aggressor is done, then reestablishes the best cache if the top of
    /// book drained.
    fn match_level(
        &mut self,
        aggressor: ArenaIndex,
        maker_side: Side,
        price: i64,
        processing_start: u64,
    ) {
        match self.book.level(maker_side, price) {
            Some(level) if !level.is_empty() => {}
            _ => return,
        }

        loop {
            if self.arena.get(aggressor).remaining == 0 {
                break;
            }
            let maker_index = self
                .book
                .level(maker_side, price)
                .map_or(NULL_INDEX, |level| level.peek_head());
            if maker_index == NULL_INDEX {
                break;
            }

            let maker = self.arena.get(maker_index);
            let (maker_id, maker_remaining) = (maker.order_id, maker.remaining);
            let quantity = self.arena.get(aggressor).remaining.min(maker_remaining);

            self.record_trade(aggressor, maker_id, price, quantity, processing_start);

            self.arena.get_mut(aggressor).remaining -= quantity;

            if maker_remaining == quantity {
                // Unlink before zeroing remaining so the level aggregate
                // drops by the full resting amount.
                let level = self.book.level_mut(maker_side, price).expect("in-domain");
                level.pop_front(&mut self.arena);

                let node = self.arena.get_mut(maker_index);
                node.remaining = 0;
                node.status = OrderStatus::Filled;
                let maker_type = node.order_type;

                self.stats.type_stats_mut(maker_type).filled += 1;
                self.directory.remove(maker_id);
                self.arena.free(maker_index);
            } else {
                let node = self.arena.get_mut(maker_index);
                node.remaining -= quantity;
                node.status = OrderStatus::PartialFill;

                let level = self.book.level_mut(maker_side, price).expect("in-domain");
                level.subtract_qty(quantity);
            }
        }

        self.publish_level_update(maker_side, price);
        self.book.refresh_best_after_drain(maker_side, price);
    }

    fn record_trade(
        &mut self,
        aggressor: ArenaIndex,
        resting_id: u64,
        price: i64,
        quantity: u64,
        processing_start: u64,
    ) {
        let now = self.clock.now_nanos();
        self.latencies.record(now.saturating_sub(processing_start));

        self.stats.trades_executed += 1;
        self.stats.total_buy_matched += quantity;
        self.stats.total_sell_matched += quantity;

        let node = self.arena.get(aggressor);
        let (aggressor_id, aggressor_side) = (node.order_id, node.side);
        self.publisher.on_trade(&TradeEvent {
            aggressor_id,
            resting_id,
            aggressor_side,
            price,
            quantity,
            timestamp: now,
        });
    }

    // ------------------------------------------------------------------
    // CANCEL handling
    // ------------------------------------------------------------------

    /// Idempotent: an unknown or already-resolved id is a silent no-op.
    fn handle_cancel(&mut self, order_id: u64) {
        let Some(index) = self.directory.get(order_id) else {
            return;
        };

        let node = self.arena.get(index);
        let (side, price, order_type) = (node.side, node.price, node.order_type);

        self.book.remove(&mut self.arena, index);
        self.arena.get_mut(index).status = OrderStatus::Cancelled;
        self.stats.type_stats_mut(order_type).cancelled += 1;
        self.directory.remove(order_id);
        self.arena.free(index);

        self.publish_level_update(side, price);
    }

    fn publish_level_update(&mut self, side: Side, price: i64) {
        let (aggregate, order_count) = self.book.depth_at(side, price);
        self.publisher.on_level_update(&LevelUpdate {
            side,
            price,
            aggregate,
            order_count,
            timestamp: self.clock.now_nanos(),
        });
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Top-N view of the book. On demand only, never from the hot loop.
    pub fn snapshot(&self) -> BookSnapshot {
        self.book.snapshot(self.snapshot_depth, self.clock.now_nanos())
    }

    /// Build a snapshot and hand it to the publisher.
    pub fn publish_snapshot(&mut self) -> BookSnapshot {
        let snapshot = self.snapshot();
        self.publisher.on_snapshot(&snapshot);
        snapshot
    }

    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        self.book.best_bid()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        self.book.best_ask()
    }

    #[inline]
    pub fn spread(&self) -> Option<i64> {
        self.book.spread()
    }

    /// Resting order count.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.arena.allocated() as usize
    }

    #[inline]
    pub fn depth_at(&self, side: Side, price: i64) -> (u64, u32) {
        self.book.depth_at(side, price)
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn latencies(&self) -> &LatencyLog {
        &self.latencies
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    /// The engine time base, shareable with the producer thread.
    pub fn clock(&self) -> MonotonicClock {
        self.clock
    }

    /// Pre-fault the arena pages before entering the hot loop.
    pub fn warm_up(&mut self) {
        self.arena.warm_up();
    }

    /// Hash of observable book state, for determinism tests.
    pub fn state_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.book.best_bid().hash(&mut hasher);
        self.book.best_ask().hash(&mut hasher);
        self.directory.len().hash(&mut hasher);
        self.arena.allocated().hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::MemoryPublisher;

    fn engine() -> MatchingEngine<MemoryPublisher> {
        let config = EngineConfig {
            max_orders: 10_000,
            ring_capacity: 1 << 10,
            ..Default::default()
        };
        MatchingEngine::new(&config, MemoryPublisher::new()).unwrap()
    }

    fn limit(engine: &mut MatchingEngine<MemoryPublisher>, id: u64, side: Side, price: i64, qty: u64) {
        assert!(engine.process(Command::limit(id, side, price, qty, 0)));
    }

    #[test]
    fn test_resting_bid_no_match() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Buy, 5000, 100);

        assert_eq!(eng.best_bid(), Some(5000));
        assert_eq!(eng.best_ask(), None);
        assert_eq!(eng.order_count(), 1);
        assert!(eng.publisher().trades.is_empty());
        // Resting the order publishes its level.
        assert_eq!(eng.publisher().level_updates.len(), 1);
        assert_eq!(eng.publisher().level_updates[0].aggregate, 100);
    }

    #[test]
    fn test_full_cross_at_maker_price() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Sell, 5000, 100);
        limit(&mut eng, 2, Side::Buy, 5005, 100);

        let trades = &eng.publisher().trades;
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].aggressor_id, 2);
        assert_eq!(trades[0].resting_id, 1);
        assert_eq!(trades[0].aggressor_side, Side::Buy);
        // Maker-priced: the aggressor was willing to pay 5005.
        assert_eq!(trades[0].price, 5000);
        assert_eq!(trades[0].quantity, 100);

        assert_eq!(eng.order_count(), 0);
        assert_eq!(eng.best_ask(), None);
        assert_eq!(eng.best_bid(), None);
        assert_eq!(eng.stats().type_stats(OrderType::Limit).filled, 2);
    }

    #[test]
    fn test_partial_fill_books_residue() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Sell, 5000, 30);
        limit(&mut eng, 2, Side::Buy, 5000, 100);

        assert_eq!(eng.publisher().trades.len(), 1);
        assert_eq!(eng.publisher().trades[0].quantity, 30);

        // 70 lots rest on the bid.
        assert_eq!(eng.best_bid(), Some(5000));
        assert_eq!(eng.depth_at(Side::Buy, 5000), (70, 1));
        assert_eq!(eng.stats().type_stats(OrderType::Limit).partial_fills, 1);
    }

    #[test]
    fn test_sweep_multiple_levels_price_priority() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Sell, 5020, 50);
        limit(&mut eng, 2, Side::Sell, 5000, 50);
        limit(&mut eng, 3, Side::Sell, 5010, 50);

        limit(&mut eng, 4, Side::Buy, 5020, 120);

        let trades = &eng.publisher().trades;
        assert_eq!(trades.len(), 3);
        assert_eq!((trades[0].price, trades[0].quantity), (5000, 50));
        assert_eq!((trades[1].price, trades[1].quantity), (5010, 50));
        assert_eq!((trades[2].price, trades[2].quantity), (5020, 20));

        assert_eq!(eng.best_ask(), Some(5020));
        assert_eq!(eng.depth_at(Side::Sell, 5020), (30, 1));
    }

    #[test]
    fn test_fifo_within_level() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Sell, 5000, 100);
        limit(&mut eng, 2, Side::Sell, 5000, 100);
        limit(&mut eng, 3, Side::Sell, 5000, 100);

        limit(&mut eng, 4, Side::Buy, 5000, 200);

        let trades = &eng.publisher().trades;
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].resting_id, 1);
        assert_eq!(trades[1].resting_id, 2);
        assert_eq!(eng.depth_at(Side::Sell, 5000), (100, 1));
    }

    #[test]
    fn test_best_ask_rescan_after_sweep() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Sell, 5000, 40);
        limit(&mut eng, 2, Side::Sell, 5001, 60);

        limit(&mut eng, 3, Side::Buy, 5000, 40);
        assert_eq!(eng.best_ask(), Some(5001));

        limit(&mut eng, 4, Side::Buy, 5001, 60);
        assert_eq!(eng.best_ask(), None);
    }

    #[test]
    fn test_cancel_resting_order() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Buy, 5000, 100);
        assert!(eng.process(Command::cancel(1, 0)));

        assert_eq!(eng.order_count(), 0);
        assert_eq!(eng.best_bid(), None);
        assert_eq!(eng.stats().type_stats(OrderType::Limit).cancelled, 1);
        // Cancel publishes the emptied level.
        let last = eng.publisher().level_updates.last().unwrap();
        assert_eq!(last.aggregate, 0);
        assert_eq!(last.order_count, 0);
    }

    #[test]
    fn test_cancel_unknown_is_silent() {
        let mut eng = engine();
        assert!(eng.process(Command::cancel(999, 0)));
        assert_eq!(eng.stats().orders_rejected, 0);
        assert!(eng.publisher().level_updates.is_empty());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Buy, 5000, 100);
        assert!(eng.process(Command::cancel(1, 0)));
        assert!(eng.process(Command::cancel(1, 0)));
        assert_eq!(eng.stats().type_stats(OrderType::Limit).cancelled, 1);
    }

    #[test]
    fn test_out_of_bounds_price_rejected() {
        let mut eng = engine();
        assert!(eng.process(Command::limit(1, Side::Buy, 10_001, 100, 0)));
        assert!(eng.process(Command::limit(2, Side::Sell, -1, 100, 0)));

        assert_eq!(eng.stats().orders_rejected, 2);
        assert_eq!(eng.order_count(), 0);
        assert_eq!(eng.best_bid(), None);
        assert_eq!(eng.best_ask(), None);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut eng = engine();
        assert!(eng.process(Command::limit(1, Side::Buy, 5000, 0, 0)));
        assert_eq!(eng.stats().orders_rejected, 1);
        assert_eq!(eng.order_count(), 0);
    }

    #[test]
    fn test_duplicate_live_id_rejected() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Buy, 5000, 100);
        assert!(eng.process(Command::limit(1, Side::Sell, 6000, 50, 0)));

        assert_eq!(eng.stats().orders_rejected, 1);
        assert_eq!(eng.order_count(), 1);
        // The resolved id becomes reusable.
        assert!(eng.process(Command::cancel(1, 0)));
        limit(&mut eng, 1, Side::Buy, 5000, 100);
        assert_eq!(eng.order_count(), 1);
    }

    #[test]
    fn test_pool_exhaustion_rejects_without_disturbing_book() {
        let config = EngineConfig {
            max_orders: 4,
            ring_capacity: 1 << 4,
            ..Default::default()
        };
        let mut eng = MatchingEngine::new(&config, MemoryPublisher::new()).unwrap();

        for id in 1..=4 {
            limit(&mut eng, id, Side::Buy, 4000 + id as i64, 10);
        }
        assert_eq!(eng.order_count(), 4);

        assert!(eng.process(Command::limit(5, Side::Buy, 4999, 10, 0)));
        assert_eq!(eng.stats().orders_rejected, 1);
        assert_eq!(eng.order_count(), 4);
        assert_eq!(eng.best_bid(), Some(4004));
    }

    #[test]
    fn test_ioc_partial_never_books() {
        let mut eng = engine();
        limit(&mut eng, 10, Side::Sell, 5000, 30);
        assert!(eng.process(Command::ioc(11, Side::Buy, 5000, 100, 0)));

        assert_eq!(eng.publisher().trades.len(), 1);
        assert_eq!(eng.publisher().trades[0].quantity, 30);
        assert_eq!(eng.order_count(), 0);
        assert_eq!(eng.best_bid(), None);
        assert_eq!(eng.stats().type_stats(OrderType::Ioc).cancelled, 1);
    }

    #[test]
    fn test_ioc_no_cross_is_pure_cancel() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Sell, 6000, 100);
        assert!(eng.process(Command::ioc(2, Side::Buy, 5000, 100, 0)));

        assert!(eng.publisher().trades.is_empty());
        assert_eq!(eng.order_count(), 1);
        assert_eq!(eng.stats().type_stats(OrderType::Ioc).cancelled, 1);
    }

    #[test]
    fn test_fok_infeasible_leaves_book_untouched() {
        let mut eng = engine();
        limit(&mut eng, 20, Side::Sell, 5000, 40);
        let hash_before = eng.state_hash();

        assert!(eng.process(Command::fok(21, Side::Buy, 5000, 100, 0)));

        assert!(eng.publisher().trades.is_empty());
        assert_eq!(eng.stats().orders_rejected, 1);
        assert_eq!(eng.stats().type_stats(OrderType::Fok).rejected, 1);
        assert_eq!(eng.depth_at(Side::Sell, 5000), (40, 1));
        assert_eq!(eng.state_hash(), hash_before);
    }

    #[test]
    fn test_fok_feasible_across_levels_fills_exactly() {
        let mut eng = engine();
        limit(&mut eng, 30, Side::Sell, 5000, 40);
        limit(&mut eng, 31, Side::Sell, 5001, 60);

        assert!(eng.process(Command::fok(32, Side::Buy, 5001, 100, 0)));

        let trades = &eng.publisher().trades;
        assert_eq!(trades.len(), 2);
        assert_eq!((trades[0].resting_id, trades[0].price, trades[0].quantity), (30, 5000, 40));
        assert_eq!((trades[1].resting_id, trades[1].price, trades[1].quantity), (31, 5001, 60));

        assert_eq!(eng.best_ask(), None);
        assert_eq!(eng.order_count(), 0);
        assert_eq!(eng.stats().type_stats(OrderType::Fok).filled, 1);
    }

    #[test]
    fn test_latency_recorded_only_on_trades() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Buy, 5000, 100);
        assert!(eng.latencies().is_empty());

        limit(&mut eng, 2, Side::Sell, 5000, 60);
        assert_eq!(eng.latencies().len(), 1);
    }

    #[test]
    fn test_conservation_totals() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Sell, 5000, 70);
        limit(&mut eng, 2, Side::Buy, 5000, 100);
        limit(&mut eng, 3, Side::Sell, 5000, 30);

        let stats = eng.stats();
        assert_eq!(stats.total_buy_matched, 100);
        assert_eq!(stats.total_sell_matched, 100);
        assert!(stats.conservation_holds());
    }

    #[test]
    fn test_snapshot_depth_limit() {
        let mut eng = engine();
        for i in 0..30i64 {
            limit(&mut eng, i as u64 + 1, Side::Buy, 4000 - i, 10);
        }
        let snapshot = eng.snapshot();
        assert_eq!(snapshot.bids.len(), 20);
        assert_eq!(snapshot.bids[0].price, 4000);
    }

    #[test]
    fn test_publish_snapshot_reaches_publisher() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Buy, 5000, 10);
        eng.publish_snapshot();
        assert_eq!(eng.publisher().snapshots.len(), 1);
        assert_eq!(eng.publisher().snapshots[0].bids.len(), 1);
    }

    #[test]
    fn test_shutdown_stops_processing() {
        let mut eng = engine();
        assert!(!eng.process(Command::Shutdown));
        assert_eq!(eng.stats().orders_processed, 0);
    }

    #[test]
    fn test_non_crossed_book_after_commands() {
        let mut eng = engine();
        limit(&mut eng, 1, Side::Buy, 5000, 100);
        limit(&mut eng, 2, Side::Sell, 4999, 50);

        // The crossing trade resolved the overlap.
        match (eng.best_bid(), eng.best_ask()) {
            (Some(bid), Some(ask)) => assert!(bid < ask),
            _ => {}
        }
    }
}
