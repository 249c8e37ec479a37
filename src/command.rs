//! Command records crossing the producer/matcher boundary.
//!
//! Commands are fixed-size, trivially copyable scalars: no owned buffers may
//! travel through the ring. Everything the matcher needs to act is inlined
//! in the record.

use serde::Serialize;

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type determines what happens to unmatched quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum OrderType {
    /// Cross what is immediately marketable, book the remainder.
    #[default]
    Limit = 0,
    /// Immediate-Or-Cancel: cross, then cancel any remainder.
    Ioc = 1,
    /// Fill-Or-Kill: fill completely on arrival or reject with no fill.
    Fok = 2,
}

impl OrderType {
    /// Stable index for per-type statistics tables.
    #[inline]
    pub const fn as_index(self) -> usize {
        self as usize
    }
}

/// Order lifecycle state.
///
/// `Pending -> (PartialFill)* -> Filled | Cancelled | Rejected`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum OrderStatus {
    Pending = 0,
    PartialFill = 1,
    Filled = 2,
    Cancelled = 3,
    Rejected = 4,
}

/// Why a NEW order was rejected without touching the book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum RejectReason {
    /// Order arena has no free slot.
    PoolExhausted = 0,
    /// Price outside the configured domain.
    PriceOutOfBounds = 1,
    /// Zero quantity.
    InvalidQuantity = 2,
    /// An order with this id is already live.
    DuplicateOrderId = 3,
    /// FOK pre-check found less resting quantity than requested.
    FokInsufficientLiquidity = 4,
}

/// Submit a new order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewOrder {
    /// Producer-assigned, unique among live orders, non-zero.
    pub order_id: u64,
    pub side: Side,
    pub order_type: OrderType,
    /// Integer ticks; must lie inside the configured price domain.
    pub price: i64,
    /// Lots; must be nonzero.
    pub quantity: u64,
    /// Nanoseconds on the engine clock when the producer built the command.
    pub producer_timestamp: u64,
}

/// Cancel a live order. Unknown ids are a silent no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CancelOrder {
    pub order_id: u64,
    pub producer_timestamp: u64,
}

/// Input commands from the producer thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    New(NewOrder),
    Cancel(CancelOrder),
    /// Cooperative termination sentinel; the matcher drains up to it and exits.
    Shutdown,
}

impl Command {
    /// Convenience constructor for a limit order command.
    #[inline]
    pub const fn limit(order_id: u64, side: Side, price: i64, quantity: u64, ts: u64) -> Self {
        Command::New(NewOrder {
            order_id,
            side,
            order_type: OrderType::Limit,
            price,
            quantity,
            producer_timestamp: ts,
        })
    }

    #[inline]
    pub const fn ioc(order_id: u64, side: Side, price: i64, quantity: u64, ts: u64) -> Self {
        Command::New(NewOrder {
            order_id,
            side,
            order_type: OrderType::Ioc,
            price,
            quantity,
            producer_timestamp: ts,
        })
    }

    #[inline]
    pub const fn fok(order_id: u64, side: Side, price: i64, quantity: u64, ts: u64) -> Self {
        Command::New(NewOrder {
            order_id,
            side,
            order_type: OrderType::Fok,
            price,
            quantity,
            producer_timestamp: ts,
        })
    }

    #[inline]
    pub const fn cancel(order_id: u64, ts: u64) -> Self {
        Command::Cancel(CancelOrder {
            order_id,
            producer_timestamp: ts,
        })
    }
}
