//! Order book types.
//!
//! Provides raw order book snapshots and the derived analytics attached to
//! them by the enhancer.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// A price level in the order book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Level price.
    pub price: Decimal,

    /// Resting volume at this level.
    pub volume: u64,

    /// Running volume total from the top of this side down to this level.
    #[serde(default)]
    pub cumulative_total: u64,
}

impl BookLevel {
    /// Creates a new book level with no cumulative total.
    #[must_use]
    pub fn new(price: impl Into<Decimal>, volume: u64) -> Self {
        Self {
            price: price.into(),
            volume,
            cumulative_total: 0,
        }
    }
}

impl fmt::Display for BookLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} (cum {})",
            self.volume, self.price, self.cumulative_total
        )
    }
}

/// Raw order book snapshot for one stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Stock code.
    pub stock_code: String,

    /// Sequence number, strictly increasing per stock code.
    pub sequence: u64,

    /// Snapshot time.
    pub timestamp: DateTime<Utc>,

    /// Ask levels (sorted by price ascending).
    pub asks: Vec<BookLevel>,

    /// Bid levels (sorted by price descending).
    pub bids: Vec<BookLevel>,
}

impl OrderBookSnapshot {
    /// Creates a new empty snapshot.
    #[must_use]
    pub fn new(stock_code: impl Into<String>, sequence: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            stock_code: stock_code.into(),
            sequence,
            timestamp,
            asks: Vec::new(),
            bids: Vec::new(),
        }
    }

    /// Replaces the bid levels, recomputing cumulative totals.
    #[must_use]
    pub fn with_bids(mut self, bids: Vec<BookLevel>) -> Self {
        self.bids = accumulate(bids);
        self
    }

    /// Replaces the ask levels, recomputing cumulative totals.
    #[must_use]
    pub fn with_asks(mut self, asks: Vec<BookLevel>) -> Self {
        self.asks = accumulate(asks);
        self
    }

    /// Returns the best bid price.
    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    /// Returns the best ask price.
    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    /// Returns the total resting bid volume.
    #[must_use]
    pub fn total_bid_volume(&self) -> u64 {
        self.bids.iter().fold(0u64, |acc, l| acc.saturating_add(l.volume))
    }

    /// Returns the total resting ask volume.
    #[must_use]
    pub fn total_ask_volume(&self) -> u64 {
        self.asks.iter().fold(0u64, |acc, l| acc.saturating_add(l.volume))
    }

    /// Returns true if both sides are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Checks that asks ascend and bids descend by price.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidBook` naming the offending side.
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.stock_code.is_empty() {
            return Err(SdkError::InvalidBook("empty stock code".to_string()));
        }
        if self.asks.windows(2).any(|w| w[0].price > w[1].price) {
            return Err(SdkError::InvalidBook(format!(
                "{}: asks are not ascending",
                self.stock_code
            )));
        }
        if self.bids.windows(2).any(|w| w[0].price < w[1].price) {
            return Err(SdkError::InvalidBook(format!(
                "{}: bids are not descending",
                self.stock_code
            )));
        }
        Ok(())
    }
}

/// Fills `cumulative_total` as a running volume sum.
fn accumulate(mut levels: Vec<BookLevel>) -> Vec<BookLevel> {
    let mut total = 0u64;
    for level in &mut levels {
        total = total.saturating_add(level.volume);
        level.cumulative_total = total;
    }
    levels
}

/// Direction implied by the order-flow imbalance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImbalanceDirection {
    /// Bid volume dominates.
    Buy,
    /// Ask volume dominates.
    Sell,
    /// Neither side dominates.
    Neutral,
}

impl fmt::Display for ImbalanceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Order-flow imbalance of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Imbalance {
    /// Sum of bid volumes.
    pub total_bid_volume: u64,
    /// Sum of ask volumes.
    pub total_ask_volume: u64,
    /// Bid share of total volume, in `[0, 1]`.
    pub ratio: f64,
    /// Direction derived from `ratio`.
    pub direction: ImbalanceDirection,
}

/// A snapshot with derived display analytics.
///
/// Price-derived fields are `None` whenever the side they depend on is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedOrderBook {
    /// The accepted raw snapshot.
    #[serde(flatten)]
    pub snapshot: OrderBookSnapshot,

    /// Highest bid price.
    pub best_bid: Option<Decimal>,

    /// Lowest ask price.
    pub best_ask: Option<Decimal>,

    /// Best ask minus best bid.
    pub spread: Option<Decimal>,

    /// Spread as a percentage of the mid price.
    pub spread_pct: Option<Decimal>,

    /// Average of best bid and best ask.
    pub mid_price: Option<Decimal>,

    /// Order-flow imbalance.
    pub imbalance: Imbalance,
}

impl EnhancedOrderBook {
    /// Returns the stock code.
    #[must_use]
    pub fn stock_code(&self) -> &str {
        &self.snapshot.stock_code
    }

    /// Returns the sequence number of the underlying snapshot.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.snapshot.sequence
    }
}
