//! Book - direct-mapped price levels with cached top of book.
//!
//! Each side is one dense `Vec<PriceLevel>` indexed by `price - min`, so
//! price-to-level lookup is a subtraction and a load, and walking levels
//! during a match is a linear scan over contiguous memory. The bounded tick
//! domain is what makes this layout possible; prices are bounds-checked at
//! the matcher boundary and never indexed out of range.
//!
//! `best_bid`/`best_ask` are denormalized caches: an insert only improves
//! them, and any removal that empties the cached best level triggers a
//! deterministic rescan. Nothing else is allowed to touch them.

use crate::arena::{Arena, ArenaIndex};
use crate::command::Side;
use crate::config::PriceDomain;
use crate::market_data::{BookSnapshot, SnapshotLevel};
use crate::price_level::PriceLevel;

pub struct Book {
    domain: PriceDomain,
    bid_levels: Vec<PriceLevel>,
    ask_levels: Vec<PriceLevel>,
    best_bid: Option<i64>,
    best_ask: Option<i64>,
}

impl Book {
    pub fn new(domain: PriceDomain) -> Self {
        Self {
            domain,
            bid_levels: vec![PriceLevel::new(); domain.levels()],
            ask_levels: vec![PriceLevel::new(); domain.levels()],
            best_bid: None,
            best_ask: None,
        }
    }

    #[inline]
    pub fn domain(&self) -> PriceDomain {
        self.domain
    }

    /// Highest bid price with resting quantity.
    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        self.best_bid
    }

    /// Lowest ask price with resting quantity.
    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        self.best_ask
    }

    pub fn spread(&self) -> Option<i64> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Bounds-checked level access.
    #[inline]
    pub fn level(&self, side: Side, price: i64) -> Option<&PriceLevel> {
        if !self.domain.contains(price) {
            return None;
        }
        let i = self.domain.index(price);
        Some(match side {
            Side::Buy => &self.bid_levels[i],
            Side::Sell => &self.ask_levels[i],
        })
    }

    #[inline]
    pub fn level_mut(&mut self, side: Side, price: i64) -> Option<&mut PriceLevel> {
        if !self.domain.contains(price) {
            return None;
        }
        let i = self.domain.index(price);
        Some(match side {
            Side::Buy => &mut self.bid_levels[i],
            Side::Sell => &mut self.ask_levels[i],
        })
    }

    /// Aggregate quantity and order count at a price, `(0, 0)` when empty.
    pub fn depth_at(&self, side: Side, price: i64) -> (u64, u32) {
        self.level(side, price)
            .map(|l| (l.total_qty, l.count))
            .unwrap_or((0, 0))
    }

    /// Append an order (already populated in the arena) to its level and
    /// improve the cached best if it beats it.
    pub fn insert(&mut self, arena: &mut Arena, index: ArenaIndex) {
        let (side, price) = Self::node_key(arena, index);
        debug_assert!(self.domain.contains(price), "price validated upstream");

        let i = self.domain.index(price);
        match side {
            Side::Buy => {
                self.bid_levels[i].push_back(arena, index);
                if self.best_bid.map_or(true, |best| price > best) {
                    self.best_bid = Some(price);
                }
            }
            Side::Sell => {
                self.ask_levels[i].push_back(arena, index);
                if self.best_ask.map_or(true, |best| price < best) {
                    self.best_ask = Some(price);
                }
            }
        }
    }

    /// Splice an order out of its level; rescan the best cache if the level
    /// emptied at the top of book.
    pub fn remove(&mut self, arena: &mut Arena, index: ArenaIndex) {
        let (side, price) = Self::node_key(arena, index);
        debug_assert!(self.domain.contains(price), "booked orders are in-domain");

        let i = self.domain.index(price);
        match side {
            Side::Buy => {
                let emptied = self.bid_levels[i].remove(arena, index);
                if emptied && self.best_bid == Some(price) {
                    self.rescan_best_bid();
                }
            }
            Side::Sell => {
                let emptied = self.ask_levels[i].remove(arena, index);
                if emptied && self.best_ask == Some(price) {
                    self.rescan_best_ask();
                }
            }
        }
    }

    /// Reestablish the best cache after matching drained orders directly out
    /// of a level. No-op unless the level is empty and was the cached best.
    pub fn refresh_best_after_drain(&mut self, side: Side, price: i64) {
        let i = self.domain.index(price);
        match side {
            Side::Buy => {
                if self.bid_levels[i].is_empty() && self.best_bid == Some(price) {
                    self.rescan_best_bid();
                }
            }
            Side::Sell => {
                if self.ask_levels[i].is_empty() && self.best_ask == Some(price) {
                    self.rescan_best_ask();
                }
            }
        }
    }

    fn rescan_best_bid(&mut self) {
        self.best_bid = None;
        for price in (self.domain.min()..=self.domain.max()).rev() {
            if !self.bid_levels[self.domain.index(price)].is_empty() {
                self.best_bid = Some(price);
                return;
            }
        }
    }

    fn rescan_best_ask(&mut self) {
        self.best_ask = None;
        for price in self.domain.min()..=self.domain.max() {
            if !self.ask_levels[self.domain.index(price)].is_empty() {
                self.best_ask = Some(price);
                return;
            }
        }
    }

    /// Top-`depth` levels per side: bids descending, asks ascending.
    pub fn snapshot(&self, depth: usize, timestamp: u64) -> BookSnapshot {
        let mut bids = Vec::with_capacity(depth);
        let mut asks = Vec::with_capacity(depth);

        for price in (self.domain.min()..=self.domain.max()).rev() {
            let level = &self.bid_levels[self.domain.index(price)];
            if !level.is_empty() {
                bids.push(SnapshotLevel {
                    price,
                    aggregate: level.total_qty,
                    order_count: level.count,
                });
                if bids.len() >= depth {
                    break;
                }
            }
        }

        for price in self.domain.min()..=self.domain.max() {
            let level = &self.ask_levels[self.domain.index(price)];
            if !level.is_empty() {
                asks.push(SnapshotLevel {
                    price,
                    aggregate: level.total_qty,
                    order_count: level.count,
                });
                if asks.len() >= depth {
                    break;
                }
            }
        }

        BookSnapshot {
            bids,
            asks,
            timestamp,
        }
    }

    #[inline]
    fn node_key(arena: &Arena, index: ArenaIndex) -> (Side, i64) {
        let node = arena.get(index);
        (node.side, node.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{OrderStatus, OrderType};
    use crate::config::PriceDomain;

    fn make_order(arena: &mut Arena, id: u64, side: Side, price: i64, qty: u64) -> ArenaIndex {
        let idx = arena.alloc().unwrap();
        let node = arena.get_mut(idx);
        node.order_id = id;
        node.side = side;
        node.order_type = OrderType::Limit;
        node.price = price;
        node.remaining = qty;
        node.original = qty;
        node.status = OrderStatus::Pending;
        idx
    }

    fn setup() -> (Arena, Book) {
        let arena = Arena::with_capacity(100);
        let book = Book::new(PriceDomain::new(0, 10_000).unwrap());
        (arena, book)
    }

    #[test]
    fn test_empty_book() {
        let (_, book) = setup();
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.spread(), None);
    }

    #[test]
    fn test_insert_updates_best_only_on_improvement() {
        let (mut arena, mut book) = setup();

        let a = make_order(&mut arena, 1, Side::Buy, 5000, 100);
        book.insert(&mut arena, a);
        assert_eq!(book.best_bid(), Some(5000));

        let b = make_order(&mut arena, 2, Side::Buy, 5010, 100);
        book.insert(&mut arena, b);
        assert_eq!(book.best_bid(), Some(5010));

        let c = make_order(&mut arena, 3, Side::Buy, 4990, 100);
        book.insert(&mut arena, c);
        assert_eq!(book.best_bid(), Some(5010));

        let d = make_order(&mut arena, 4, Side::Sell, 5050, 100);
        book.insert(&mut arena, d);
        assert_eq!(book.best_ask(), Some(5050));

        let e = make_order(&mut arena, 5, Side::Sell, 5040, 100);
        book.insert(&mut arena, e);
        assert_eq!(book.best_ask(), Some(5040));

        assert_eq!(book.spread(), Some(30));
    }

    #[test]
    fn test_remove_rescans_best_bid() {
        let (mut arena, mut book) = setup();

        let a = make_order(&mut arena, 1, Side::Buy, 5010, 100);
        let b = make_order(&mut arena, 2, Side::Buy, 5000, 100);
        let c = make_order(&mut arena, 3, Side::Buy, 4990, 100);
        book.insert(&mut arena, a);
        book.insert(&mut arena, b);
        book.insert(&mut arena, c);

        book.remove(&mut arena, a);
        assert_eq!(book.best_bid(), Some(5000));
        book.remove(&mut arena, b);
        assert_eq!(book.best_bid(), Some(4990));
        book.remove(&mut arena, c);
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_remove_below_best_keeps_cache() {
        let (mut arena, mut book) = setup();

        let a = make_order(&mut arena, 1, Side::Sell, 5000, 100);
        let b = make_order(&mut arena, 2, Side::Sell, 5010, 100);
        book.insert(&mut arena, a);
        book.insert(&mut arena, b);

        book.remove(&mut arena, b);
        assert_eq!(book.best_ask(), Some(5000));
    }

    #[test]
    fn test_remove_from_shared_level_keeps_best() {
        let (mut arena, mut book) = setup();

        let a = make_order(&mut arena, 1, Side::Buy, 5000, 100);
        let b = make_order(&mut arena, 2, Side::Buy, 5000, 200);
        book.insert(&mut arena, a);
        book.insert(&mut arena, b);

        book.remove(&mut arena, a);
        assert_eq!(book.best_bid(), Some(5000));
        assert_eq!(book.depth_at(Side::Buy, 5000), (200, 1));
    }

    #[test]
    fn test_level_bounds_check() {
        let (_, book) = setup();
        assert!(book.level(Side::Buy, -1).is_none());
        assert!(book.level(Side::Buy, 10_001).is_none());
        assert!(book.level(Side::Buy, 0).is_some());
        assert!(book.level(Side::Sell, 10_000).is_some());
    }

    #[test]
    fn test_refresh_after_drain() {
        let (mut arena, mut book) = setup();

        let a = make_order(&mut arena, 1, Side::Sell, 5000, 100);
        let b = make_order(&mut arena, 2, Side::Sell, 5005, 100);
        book.insert(&mut arena, a);
        book.insert(&mut arena, b);

        // Drain the best level directly, the way matching does.
        let level = book.level_mut(Side::Sell, 5000).unwrap();
        level.pop_front(&mut arena);
        arena.free(a);

        // Cache is stale until the drain hook runs.
        assert_eq!(book.best_ask(), Some(5000));
        book.refresh_best_after_drain(Side::Sell, 5000);
        assert_eq!(book.best_ask(), Some(5005));
    }

    #[test]
    fn test_snapshot_ordering_and_depth() {
        let (mut arena, mut book) = setup();

        for (id, price) in [(1u64, 4990i64), (2, 5000), (3, 4980)] {
            let idx = make_order(&mut arena, id, Side::Buy, price, 10 * id);
            book.insert(&mut arena, idx);
        }
        for (id, price) in [(4u64, 5020i64), (5, 5010), (6, 5030)] {
            let idx = make_order(&mut arena, id, Side::Sell, price, 10 * id);
            book.insert(&mut arena, idx);
        }

        let snap = book.snapshot(2, 99);
        assert_eq!(snap.timestamp, 99);
        // Bids descending, truncated to depth.
        assert_eq!(snap.bids.len(), 2);
        assert_eq!(snap.bids[0].price, 5000);
        assert_eq!(snap.bids[1].price, 4990);
        // Asks ascending.
        assert_eq!(snap.asks.len(), 2);
        assert_eq!(snap.asks[0].price, 5010);
        assert_eq!(snap.asks[1].price, 5020);
        assert_eq!(snap.asks[0].aggregate, 50);
        assert_eq!(snap.asks[0].order_count, 1);
    }

    #[test]
    fn test_boundary_prices_indexable() {
        let (mut arena, mut book) = setup();

        let lo = make_order(&mut arena, 1, Side::Buy, 0, 10);
        let hi = make_order(&mut arena, 2, Side::Sell, 10_000, 10);
        book.insert(&mut arena, lo);
        book.insert(&mut arena, hi);

        assert_eq!(book.best_bid(), Some(0));
        assert_eq!(book.best_ask(), Some(10_000));
    }
}
