//! Construction-time configuration: price domain and capacities.
//!
//! The book is direct-mapped over the price domain, so the domain must be
//! fixed before the engine is built. All capacities are validated up front;
//! nothing is resized at runtime.

use thiserror::Error;

/// Errors raised while validating an [`EngineConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("price domain is inverted: min {min} > max {max}")]
    InvertedPriceDomain { min: i64, max: i64 },
    #[error("price domain [{min}, {max}] is too large to index")]
    PriceDomainTooLarge { min: i64, max: i64 },
    #[error("order capacity must be between 1 and {}", u32::MAX - 1)]
    InvalidOrderCapacity(u64),
    #[error("ring capacity must be a power of two >= 2, got {0}")]
    InvalidRingCapacity(usize),
    #[error("snapshot depth must be nonzero")]
    InvalidSnapshotDepth,
}

/// Inclusive tick range `[min, max]` the book can index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceDomain {
    min: i64,
    max: i64,
}

impl PriceDomain {
    pub fn new(min: i64, max: i64) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvertedPriceDomain { min, max });
        }
        // Level count must fit a usize-indexed Vec.
        let span = (max as i128) - (min as i128) + 1;
        if usize::try_from(span).is_err() {
            return Err(ConfigError::PriceDomainTooLarge { min, max });
        }
        Ok(Self { min, max })
    }

    #[inline]
    pub fn min(&self) -> i64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Number of addressable price levels per side.
    #[inline]
    pub fn levels(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    #[inline]
    pub fn contains(&self, price: i64) -> bool {
        price >= self.min && price <= self.max
    }

    /// Array index for an in-domain price. Callers bounds-check first.
    #[inline]
    pub fn index(&self, price: i64) -> usize {
        debug_assert!(self.contains(price));
        (price - self.min) as usize
    }
}

impl Default for PriceDomain {
    fn default() -> Self {
        Self { min: 0, max: 10_000 }
    }
}

/// Capacities and domain for one engine instance.
///
/// A multi-instrument deployment instantiates one engine per instrument,
/// each with its own config, matcher thread, and book.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub price_domain: PriceDomain,
    /// Bound on concurrently live orders (sizes the arena and directory).
    pub max_orders: u32,
    /// Command ring slot count; capacity is one less than this.
    pub ring_capacity: usize,
    /// Levels per side returned by on-demand snapshots.
    pub snapshot_depth: usize,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_orders == 0 || self.max_orders == u32::MAX {
            return Err(ConfigError::InvalidOrderCapacity(self.max_orders as u64));
        }
        if self.ring_capacity < 2 || !self.ring_capacity.is_power_of_two() {
            return Err(ConfigError::InvalidRingCapacity(self.ring_capacity));
        }
        if self.snapshot_depth == 0 {
            return Err(ConfigError::InvalidSnapshotDepth);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            price_domain: PriceDomain::default(),
            max_orders: 1_000_000,
            ring_capacity: 1 << 20,
            snapshot_depth: 20,
        }
    }
}
