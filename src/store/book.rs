//! Order book values: updates, entries and snapshots.

use crate::arena::CategoryId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a book. Each side has its own free list in the entry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookSide {
    /// Buy side, best (highest) price first
    Bid,
    /// Sell side, best (lowest) price first
    Ask,
}

impl BookSide {
    /// Number of sides, i.e. the category count of the entry arena.
    pub const COUNT: usize = 2;

    /// Returns `true` if `price` ranks ahead of `other` on this side.
    #[inline]
    pub fn is_better(self, price: f64, other: f64) -> bool {
        match self {
            BookSide::Bid => price.total_cmp(&other).is_gt(),
            BookSide::Ask => price.total_cmp(&other).is_lt(),
        }
    }
}

impl From<BookSide> for CategoryId {
    fn from(side: BookSide) -> Self {
        match side {
            BookSide::Bid => CategoryId(0),
            BookSide::Ask => CategoryId(1),
        }
    }
}

impl fmt::Display for BookSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookSide::Bid => f.write_str("BID"),
            BookSide::Ask => f.write_str("ASK"),
        }
    }
}

/// One price level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BookEntry {
    /// Level price
    pub price: f64,
    /// Quantity available at the price
    pub size: u64,
}

impl BookEntry {
    /// Creates an entry.
    pub fn new(price: f64, size: u64) -> Self {
        Self { price, size }
    }
}

/// A quote update from one source for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketUpdate {
    /// Instrument the update belongs to
    pub symbol: String,
    /// Name of the feed that produced it
    pub source: String,
    /// Bid price; non-finite values leave the bid side untouched
    pub bid_price: f64,
    /// Ask price; non-finite values leave the ask side untouched
    pub ask_price: f64,
    /// Last traded price, informational only; 0 when unknown
    pub last_price: f64,
    /// Quantity quoted at both prices; zero removes the quoted levels
    pub volume: u64,
    /// Exchange timestamp in nanoseconds
    pub timestamp: u64,
}

impl MarketUpdate {
    /// Creates a quote update without a last traded price.
    pub fn new(
        symbol: impl Into<String>,
        source: impl Into<String>,
        bid_price: f64,
        ask_price: f64,
        volume: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            source: source.into(),
            bid_price,
            ask_price,
            last_price: 0.0,
            volume,
            timestamp,
        }
    }

    /// Sets the last traded price.
    pub fn with_last_price(mut self, last_price: f64) -> Self {
        self.last_price = last_price;
        self
    }
}

/// Owned copy of one symbol's book.
///
/// Returned by [`MarketDataStore::get_book`](super::MarketDataStore::get_book);
/// reading it needs no further synchronization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    /// Instrument
    pub symbol: String,
    /// Timestamp of the last applied update, in nanoseconds
    pub timestamp: u64,
    /// Bid levels, highest price first
    pub bids: Vec<BookEntry>,
    /// Ask levels, lowest price first
    pub asks: Vec<BookEntry>,
}

impl OrderBook {
    /// Creates an empty book for `symbol`.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    /// Highest bid level.
    pub fn best_bid(&self) -> Option<BookEntry> {
        self.bids.first().copied()
    }

    /// Lowest ask level.
    pub fn best_ask(&self) -> Option<BookEntry> {
        self.asks.first().copied()
    }

    /// Best ask minus best bid.
    pub fn spread(&self) -> Option<f64> {
        Some(self.best_ask()?.price - self.best_bid()?.price)
    }

    /// Midpoint between the best bid and best ask.
    pub fn mid_price(&self) -> Option<f64> {
        Some((self.best_ask()?.price + self.best_bid()?.price) / 2.0)
    }

    /// Levels on one side.
    pub fn side(&self, side: BookSide) -> &[BookEntry] {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    /// `true` when neither side has a level.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
