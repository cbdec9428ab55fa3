//! Ask (sell-side) ladder
//!
//! Maintains sell entries sorted by price ascending (best ask first).
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};

use super::price_level::{LevelEntry, PriceLevel};

/// Ask (sell) side ladder
///
/// Levels are sorted by price ascending, so the lowest ask is first.
/// At each price level, entries are maintained in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskBook {
    /// Price levels sorted ascending (lowest price first)
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    /// Create a new empty ask book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert an entry at `price`
    pub fn insert(&mut self, price: Price, entry: LevelEntry) {
        self.levels.entry(price).or_default().insert(entry);
    }

    /// Remove an entry from the ask book
    ///
    /// Returns the removed entry if it was found
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> Option<LevelEntry> {
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove(order_id)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(removed)
    }

    /// Get the best ask (lowest price) and its total quantity
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Get the best ask price
    pub fn best_ask_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Get mutable reference to the best ask level
    pub(crate) fn best_level_mut(&mut self) -> Option<(Price, &mut PriceLevel)> {
        self.levels.iter_mut().next().map(|(price, level)| (*price, level))
    }

    /// Drop a level once matching has emptied it
    pub(crate) fn remove_level_if_empty(&mut self, price: Price) {
        if self.levels.get(&price).map_or(false, PriceLevel::is_empty) {
            self.levels.remove(&price);
        }
    }

    /// Levels best-first
    pub fn levels(&self) -> impl Iterator<Item = (Price, &PriceLevel)> {
        self.levels.iter().map(|(price, level)| (*price, level))
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

    /// Check if the ask book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn entry(id: &str, priority: u64, qty: &str) -> LevelEntry {
        LevelEntry {
            order_id: Some(OrderId::new(id)),
            priority,
            remaining: qty.parse().unwrap(),
        }
    }

    #[test]
    fn test_ask_book_best_ask() {
        let mut book = AskBook::new();
        book.insert(px("150.02"), entry("A", 1, "1.0"));
        book.insert(px("150.01"), entry("B", 2, "2.0")); // Lower price
        book.insert(px("150.03"), entry("C", 3, "1.5"));

        let (best_price, best_qty) = book.best_ask().unwrap();
        assert_eq!(best_price, px("150.01"));
        assert_eq!(best_qty, "2.0".parse().unwrap());
        assert_eq!(book.best_ask_price(), Some(px("150.01")));
    }

    #[test]
    fn test_ask_book_remove_keeps_other_levels() {
        let mut book = AskBook::new();
        book.insert(px("150.01"), entry("A", 1, "1.0"));
        book.insert(px("150.02"), entry("B", 2, "1.0"));

        assert!(book.remove(&OrderId::new("A"), px("150.01")).is_some());
        assert_eq!(book.level_count(), 1);
        assert_eq!(book.best_ask_price(), Some(px("150.02")));
    }

    #[test]
    fn test_ask_book_depth_snapshot() {
        let mut book = AskBook::new();
        for (i, p) in ["150.05", "150.01", "150.03", "150.02"].iter().enumerate() {
            book.insert(px(p), entry(&format!("O{}", i), i as u64 + 1, "1.0"));
        }

        let depth = book.depth_snapshot(3);

        // Should return top 3 levels (lowest prices first)
        assert_eq!(depth.len(), 3);
        assert_eq!(depth[0].0, px("150.01"));
        assert_eq!(depth[1].0, px("150.02"));
        assert_eq!(depth[2].0, px("150.03"));
    }

    #[test]
    fn test_ask_book_remove_level_if_empty() {
        let mut book = AskBook::new();
        book.insert(px("150.01"), entry("A", 1, "1.0"));

        let (price, level) = book.best_level_mut().unwrap();
        level.fill_front("1.0".parse().unwrap());
        book.remove_level_if_empty(price);

        assert!(book.is_empty());
    }
}
