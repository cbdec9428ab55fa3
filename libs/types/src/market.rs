//! External market data types
//!
//! A `MarketSnapshot` is a venue's full view of one symbol's book. Applying it
//! replaces the internal ladders wholesale rather than merging.

use crate::errors::BookError;
use crate::ids::Symbol;
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// One resting entry as reported by the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLevel {
    pub price: Price,
    pub quantity: Quantity,
    /// Feed-side queue position; lower means earlier
    pub priority: u64,
}

impl SnapshotLevel {
    pub fn new(price: Price, quantity: Quantity, priority: u64) -> Self {
        Self { price, quantity, priority }
    }
}

/// Full book state for one symbol from an outside venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<SnapshotLevel>,
    pub asks: Vec<SnapshotLevel>,
    pub last_trade_price: Price,
    pub timestamp: u64, // Unix nanos
}

impl MarketSnapshot {
    /// Check entries are positive and the book is not crossed
    pub fn validate(&self) -> Result<(), BookError> {
        if self.symbol.is_empty() {
            return Err(BookError::invalid_snapshot("empty symbol"));
        }

        for level in self.bids.iter().chain(self.asks.iter()) {
            if level.quantity.is_zero() {
                return Err(BookError::invalid_snapshot(format!(
                    "zero quantity at price {}",
                    level.price
                )));
            }
            if level.price.is_zero() {
                return Err(BookError::invalid_snapshot("zero price entry"));
            }
        }

        for (side, levels) in [("bid", &self.bids), ("ask", &self.asks)] {
            let total = levels
                .iter()
                .try_fold(Quantity::zero(), |acc, level| acc.checked_add(level.quantity));
            if total.is_none() {
                return Err(BookError::invalid_snapshot(format!(
                    "{} side quantity overflows",
                    side
                )));
            }
        }

        let best_bid = self.bids.iter().map(|l| l.price).max();
        let best_ask = self.asks.iter().map(|l| l.price).min();
        if let (Some(bid), Some(ask)) = (best_bid, best_ask) {
            if bid >= ask {
                return Err(BookError::invalid_snapshot(format!(
                    "crossed book: bid {} >= ask {}",
                    bid, ask
                )));
            }
        }

        Ok(())
    }
}
