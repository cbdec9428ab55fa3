//! Price level implementation with FIFO queue
//!
//! A price level contains all entries resting at one price. Entries are kept
//! in ascending priority rank, so the front of the queue is always the entry
//! that matches first.

use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::Quantity;

/// An entry resting at a price level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelEntry {
    /// None for liquidity loaded from an external snapshot
    pub order_id: Option<OrderId>,
    /// Per-symbol acceptance rank; lower matches first
    pub priority: u64,
    pub remaining: Quantity,
}

/// A price level containing entries at a specific price
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceLevel {
    /// Queue of entries at this price level (priority order)
    entries: VecDeque<LevelEntry>,
    /// Total quantity available at this level
    total_quantity: Quantity,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Insert an entry at the back of the queue (time priority)
    ///
    /// Callers hand out strictly increasing ranks, so pushing to the back keeps
    /// the queue sorted.
    pub fn insert(&mut self, entry: LevelEntry) {
        debug_assert!(
            self.entries.back().map_or(true, |back| back.priority < entry.priority),
            "priority ranks must be strictly increasing within a level"
        );
        self.total_quantity = self.total_quantity + entry.remaining;
        self.entries.push_back(entry);
    }

    /// Remove an entry from the queue by OrderId
    ///
    /// Returns the removed entry, or None if not found
    pub fn remove(&mut self, order_id: &OrderId) -> Option<LevelEntry> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.order_id.as_ref() == Some(order_id))?;
        let entry = self.entries.remove(position)?;

        self.total_quantity = self.total_quantity.saturating_sub(entry.remaining);

        Some(entry)
    }

    /// Peek at the front entry without removing it
    pub fn peek_front(&self) -> Option<&LevelEntry> {
        self.entries.front()
    }

    /// Fill up to `quantity` from the front entry
    ///
    /// Returns a copy of the front entry as it was before the fill together
    /// with the filled amount. The entry is removed once it reaches zero.
    pub fn fill_front(&mut self, quantity: Quantity) -> Option<(LevelEntry, Quantity)> {
        let front = self.entries.front_mut()?;
        let before = front.clone();
        let filled = quantity.min(front.remaining);

        front.remaining = front.remaining.saturating_sub(filled);
        if front.remaining.is_zero() {
            self.entries.pop_front();
        }

        self.total_quantity = self.total_quantity.saturating_sub(filled);

        Some((before, filled))
    }

    /// Entries in priority order
    pub fn entries(&self) -> impl Iterator<Item = &LevelEntry> {
        self.entries.iter()
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the total quantity at this price level
    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    /// Get the number of entries at this level
    pub fn order_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    fn entry(id: &str, priority: u64, remaining: &str) -> LevelEntry {
        LevelEntry {
            order_id: Some(OrderId::new(id)),
            priority,
            remaining: qty(remaining),
        }
    }

    #[test]
    fn test_price_level_insert() {
        let mut level = PriceLevel::new();
        level.insert(entry("A", 1, "1.5"));

        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), qty("1.5"));
        assert!(!level.is_empty());
    }

    #[test]
    fn test_price_level_fifo_order() {
        let mut level = PriceLevel::new();
        level.insert(entry("A", 1, "1.0"));
        level.insert(entry("B", 2, "2.0"));
        level.insert(entry("C", 3, "3.0"));

        let front = level.peek_front().unwrap();
        assert_eq!(front.order_id, Some(OrderId::new("A")));
        assert_eq!(front.remaining, qty("1.0"));
    }

    #[test]
    fn test_price_level_remove_middle() {
        let mut level = PriceLevel::new();
        level.insert(entry("A", 1, "1.0"));
        level.insert(entry("B", 2, "2.0"));
        level.insert(entry("C", 3, "3.0"));

        let removed = level.remove(&OrderId::new("B")).unwrap();
        assert_eq!(removed.remaining, qty("2.0"));
        assert_eq!(level.order_count(), 2);
        assert_eq!(level.total_quantity(), qty("4.0"));

        let ids: Vec<_> = level.entries().map(|e| e.priority).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_remove_unknown_returns_none() {
        let mut level = PriceLevel::new();
        level.insert(entry("A", 1, "1.0"));
        assert!(level.remove(&OrderId::new("Z")).is_none());
        assert_eq!(level.total_quantity(), qty("1.0"));
    }

    #[test]
    fn test_snapshot_entries_are_not_removable_by_id() {
        let mut level = PriceLevel::new();
        level.insert(LevelEntry {
            order_id: None,
            priority: 1,
            remaining: qty("5"),
        });
        assert!(level.remove(&OrderId::new("")).is_none());
        assert_eq!(level.order_count(), 1);
    }

    #[test]
    fn test_fill_front_partial_then_complete() {
        let mut level = PriceLevel::new();
        level.insert(entry("A", 1, "5.0"));

        let (before, filled) = level.fill_front(qty("3.0")).unwrap();
        assert_eq!(before.remaining, qty("5.0"));
        assert_eq!(filled, qty("3.0"));
        assert_eq!(level.total_quantity(), qty("2.0"));
        assert_eq!(level.order_count(), 1);

        let (_, filled) = level.fill_front(qty("9.0")).unwrap();
        assert_eq!(filled, qty("2.0"));
        assert!(level.is_empty());
        assert_eq!(level.total_quantity(), Quantity::zero());
    }

    #[test]
    fn test_price_level_total_quantity_invariant() {
        let mut level = PriceLevel::new();
        level.insert(entry("A", 1, "1.5"));
        level.insert(entry("B", 2, "2.5"));
        level.insert(entry("C", 3, "3.0"));

        let sum: Quantity = level.entries().map(|e| e.remaining).sum();
        assert_eq!(level.total_quantity(), sum);
        assert_eq!(level.total_quantity(), qty("7.0"));
    }
}
