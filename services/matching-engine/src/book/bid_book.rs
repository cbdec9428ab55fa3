//! Bid (buy-side) ladder
//!
//! Maintains buy entries sorted by price descending (best bid first).
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};

use super::price_level::{LevelEntry, PriceLevel};

/// Bid (buy) side ladder
///
/// Levels are sorted by price descending, so the highest bid is first.
/// At each price level, entries are maintained in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BidBook {
    /// Price levels keyed ascending; iterated in reverse for best-first
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    /// Create a new empty bid book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert an entry at `price`
    pub fn insert(&mut self, price: Price, entry: LevelEntry) {
        self.levels.entry(price).or_default().insert(entry);
    }

    /// Remove an entry from the bid book
    ///
    /// Returns the removed entry if it was found
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> Option<LevelEntry> {
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove(order_id)?;
        // Remove empty price levels to keep book clean
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(removed)
    }

    /// Get the best bid (highest price) and its total quantity
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        // BTreeMap iter is ascending, so we need last()
        self.levels
            .iter()
            .next_back()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Get the best bid price
    pub fn best_bid_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    /// Get mutable reference to the best bid level
    pub(crate) fn best_level_mut(&mut self) -> Option<(Price, &mut PriceLevel)> {
        self.levels.iter_mut().next_back().map(|(price, level)| (*price, level))
    }

    /// Drop a level once matching has emptied it
    pub(crate) fn remove_level_if_empty(&mut self, price: Price) {
        if self.levels.get(&price).map_or(false, PriceLevel::is_empty) {
            self.levels.remove(&price);
        }
    }

    /// Levels best-first
    pub fn levels(&self) -> impl Iterator<Item = (Price, &PriceLevel)> {
        self.levels.iter().rev().map(|(price, level)| (*price, level))
    }

    /// Get depth snapshot (top N price levels)
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.levels()
            .take(depth)
            .map(|(price, level)| (price, level.total_quantity()))
            .collect()
    }

    /// Total quantity across the top `depth` levels
    pub fn total_quantity(&self, depth: usize) -> Quantity {
        self.levels().take(depth).map(|(_, level)| level.total_quantity()).sum()
    }

    /// Total quantity resting on this side
    ///
    /// The order book refuses input that would make this unrepresentable.
    pub fn resting_quantity(&self) -> Quantity {
        self.levels.values().map(PriceLevel::total_quantity).sum()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Check if the bid book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
