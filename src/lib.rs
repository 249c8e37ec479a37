//! # tick-lob
//!
//! A single-venue limit order book matching engine for low-latency trading
//! simulation.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one matcher thread owns the book, arena, and
//!   directory exclusively (no locks)
//! - **Direct-Mapped Book**: a bounded tick domain collapses price lookup
//!   to a subtraction and a load
//! - **Arena Allocation**: all order records preallocated; the hot path
//!   never touches the allocator
//! - **Lock-Free Hand-Off**: a release/acquire SPSC ring is the only
//!   structure shared between threads
//!
//! ## Architecture
//!
//! ```text
//! [Producer Thread] --> [SPSC Command Ring] --> [Matcher Thread]
//!                                                     |
//!                                            [Publisher Hook]
//! ```

pub mod arena;
pub mod book;
pub mod clock;
pub mod command;
pub mod config;
pub mod directory;
pub mod engine;
pub mod feed;
pub mod market_data;
pub mod matching;
pub mod price_level;
pub mod spsc;
pub mod stats;

// Re-exports for convenience
pub use arena::{Arena, ArenaIndex, OrderNode, NULL_INDEX};
pub use book::Book;
pub use clock::MonotonicClock;
pub use command::{CancelOrder, Command, NewOrder, OrderStatus, OrderType, RejectReason, Side};
pub use config::{ConfigError, EngineConfig, PriceDomain};
pub use directory::OrderDirectory;
pub use engine::{Engine, RunLimit};
pub use feed::{FeedConfig, FeedHandler};
pub use market_data::{
    BookSnapshot, ConsolePublisher, FanoutPublisher, FilePublisher, LevelUpdate,
    MarketDataPublisher, MarketEvent, MemoryPublisher, NullPublisher, RingPublisher, SnapshotLevel,
    TradeEvent,
};
pub use matching::MatchingEngine;
pub use price_level::PriceLevel;
pub use spsc::{Consumer, Producer, SpscRing};
pub use stats::{EngineStats, LatencyLog, LatencyPercentiles, OrderTypeStats};
