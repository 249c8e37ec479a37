//! Market data - event schemas and the publisher hook.
//!
//! The matcher calls the publisher synchronously on every trade and level
//! mutation; snapshots are produced on demand, never from the hot loop.
//! Publishers must not call back into book-mutating operations. A publisher
//! that wants non-blocking fan-out interposes its own bounded queue (see
//! [`RingPublisher`]); the engine itself never grows an internal buffer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::command::Side;
use crate::spsc::Producer;

/// A trade execution. The price is the resting order's price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TradeEvent {
    pub aggressor_id: u64,
    pub resting_id: u64,
    pub aggressor_side: Side,
    pub price: i64,
    pub quantity: u64,
    /// Nanoseconds on the engine clock at execution.
    pub timestamp: u64,
}

/// Incremental depth change at one price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LevelUpdate {
    pub side: Side,
    pub price: i64,
    /// Remaining aggregate at the level; zero means the level emptied.
    pub aggregate: u64,
    pub order_count: u32,
    pub timestamp: u64,
}

/// One side entry of an on-demand snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SnapshotLevel {
    pub price: i64,
    pub aggregate: u64,
    pub order_count: u32,
}

/// Top-of-book snapshot: bids descending, asks ascending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BookSnapshot {
    pub bids: Vec<SnapshotLevel>,
    pub asks: Vec<SnapshotLevel>,
    pub timestamp: u64,
}

/// Synchronous sink for matcher events.
pub trait MarketDataPublisher {
    fn on_trade(&mut self, trade: &TradeEvent);
    fn on_level_update(&mut self, update: &LevelUpdate);
    fn on_snapshot(&mut self, _snapshot: &BookSnapshot) {}
}

/// Discards everything. The default for latency-sensitive runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPublisher;

impl MarketDataPublisher for NullPublisher {
    #[inline]
    fn on_trade(&mut self, _trade: &TradeEvent) {}

    #[inline]
    fn on_level_update(&mut self, _update: &LevelUpdate) {}
}

/// Buffers events in memory. Used by tests and replay tooling.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    pub trades: Vec<TradeEvent>,
    pub level_updates: Vec<LevelUpdate>,
    pub snapshots: Vec<BookSnapshot>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.trades.clear();
        self.level_updates.clear();
        self.snapshots.clear();
    }

    /// Total traded quantity across buffered trades.
    pub fn traded_quantity(&self) -> u64 {
        self.trades.iter().map(|t| t.quantity).sum()
    }
}

impl MarketDataPublisher for MemoryPublisher {
    fn on_trade(&mut self, trade: &TradeEvent) {
        self.trades.push(*trade);
    }

    fn on_level_update(&mut self, update: &LevelUpdate) {
        self.level_updates.push(*update);
    }

    fn on_snapshot(&mut self, snapshot: &BookSnapshot) {
        self.snapshots.push(snapshot.clone());
    }
}

/// Prints trades always, level updates and snapshots only when verbose.
#[derive(Clone, Copy, Debug)]
pub struct ConsolePublisher {
    verbose: bool,
}

impl ConsolePublisher {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl MarketDataPublisher for ConsolePublisher {
    fn on_trade(&mut self, trade: &TradeEvent) {
        println!(
            "TRADE: aggressor={} resting={} side={:?} price={} qty={}",
            trade.aggressor_id, trade.resting_id, trade.aggressor_side, trade.price, trade.quantity
        );
    }

    fn on_level_update(&mut self, update: &LevelUpdate) {
        if !self.verbose {
            return;
        }
        println!(
            "L2_UPDATE: {} price={} qty={} orders={}",
            match update.side {
                Side::Buy => "BID",
                Side::Sell => "ASK",
            },
            update.price,
            update.aggregate,
            update.order_count
        );
    }

    fn on_snapshot(&mut self, snapshot: &BookSnapshot) {
        if !self.verbose {
            return;
        }
        println!("L2_SNAPSHOT:");
        println!("  ASKS:");
        for level in snapshot.asks.iter().rev() {
            println!(
                "    {:>8} | {:>10} | {:>4}",
                level.price, level.aggregate, level.order_count
            );
        }
        println!("  --------");
        println!("  BIDS:");
        for level in &snapshot.bids {
            println!(
                "    {:>8} | {:>10} | {:>4}",
                level.price, level.aggregate, level.order_count
            );
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum FileRecord<'a> {
    Trade(&'a TradeEvent),
    LevelUpdate(&'a LevelUpdate),
    Snapshot(&'a BookSnapshot),
}

/// Appends events as JSON lines. Intended for offline replay and analysis;
/// writes go through a buffer, so call [`FilePublisher::flush`] (or drop)
/// before reading the file back.
pub struct FilePublisher {
    writer: BufWriter<File>,
}

impl FilePublisher {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        // One header line with the wall-clock start; event timestamps are
        // engine-clock nanoseconds relative to it.
        writeln!(
            writer,
            "{{\"event\":\"run_start\",\"wall_clock\":\"{}\"}}",
            chrono::Utc::now().to_rfc3339()
        )?;
        Ok(Self { writer })
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn write_record(&mut self, record: &FileRecord<'_>) {
        // Serialization of these plain structs cannot fail; IO errors are
        // swallowed so the matcher never stalls on a sink.
        if serde_json::to_writer(&mut self.writer, record).is_ok() {
            let _ = self.writer.write_all(b"\n");
        }
    }
}

impl MarketDataPublisher for FilePublisher {
    fn on_trade(&mut self, trade: &TradeEvent) {
        self.write_record(&FileRecord::Trade(trade));
    }

    fn on_level_update(&mut self, update: &LevelUpdate) {
        self.write_record(&FileRecord::LevelUpdate(update));
    }

    fn on_snapshot(&mut self, snapshot: &BookSnapshot) {
        self.write_record(&FileRecord::Snapshot(snapshot));
    }
}

/// Hot-loop event for ring fan-out; snapshots stay out of band.
#[derive(Clone, Copy, Debug)]
pub enum MarketEvent {
    Trade(TradeEvent),
    Level(LevelUpdate),
}

/// Pushes events into a bounded SPSC ring, dropping on overflow. This is
/// the non-blocking interposition: a downstream consumer drains the ring on
/// its own thread while the matcher never waits.
pub struct RingPublisher {
    producer: Producer<MarketEvent>,
    dropped: u64,
}

impl RingPublisher {
    pub fn new(producer: Producer<MarketEvent>) -> Self {
        Self {
            producer,
            dropped: 0,
        }
    }

    /// Events discarded because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl MarketDataPublisher for RingPublisher {
    fn on_trade(&mut self, trade: &TradeEvent) {
        if !self.producer.try_push(MarketEvent::Trade(*trade)) {
            self.dropped += 1;
        }
    }

    fn on_level_update(&mut self, update: &LevelUpdate) {
        if !self.producer.try_push(MarketEvent::Level(*update)) {
            self.dropped += 1;
        }
    }
}

/// Fans events out to a set of boxed publishers, in registration order.
pub struct FanoutPublisher {
    publishers: Vec<Box<dyn MarketDataPublisher>>,
    enabled: bool,
}

impl Default for FanoutPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl FanoutPublisher {
    pub fn new() -> Self {
        Self {
            publishers: Vec::new(),
            enabled: true,
        }
    }

    pub fn add(&mut self, publisher: Box<dyn MarketDataPublisher>) {
        self.publishers.push(publisher);
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl MarketDataPublisher for FanoutPublisher {
    fn on_trade(&mut self, trade: &TradeEvent) {
        if !self.enabled {
            return;
        }
        for p in &mut self.publishers {
            p.on_trade(trade);
        }
    }

    fn on_level_update(&mut self, update: &LevelUpdate) {
        if !self.enabled {
            return;
        }
        for p in &mut self.publishers {
            p.on_level_update(update);
        }
    }

    fn on_snapshot(&mut self, snapshot: &BookSnapshot) {
        if !self.enabled {
            return;
        }
        for p in &mut self.publishers {
            p.on_snapshot(snapshot);
        }
    }
}
