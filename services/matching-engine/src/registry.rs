//! Resting order registry
//!
//! Maps an order id to where it rests so cancel and modify can go straight
//! to the right price level instead of scanning the ladders.

use std::collections::HashMap;
use types::ids::OrderId;
use types::numeric::Price;
use types::order::Side;

/// Where a resting order lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestingLocation {
    pub side: Side,
    pub price: Price,
    pub priority: u64,
}

/// Registry of orders currently resting in one symbol's book
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderRegistry {
    entries: HashMap<OrderId, RestingLocation>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Record a newly resting order
    ///
    /// Returns false (and leaves the registry unchanged) if the id is
    /// already resting.
    pub fn insert(&mut self, order_id: OrderId, location: RestingLocation) -> bool {
        if self.entries.contains_key(&order_id) {
            return false;
        }
        self.entries.insert(order_id, location);
        true
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&RestingLocation> {
        self.entries.get(order_id)
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.entries.contains_key(order_id)
    }

    pub fn remove(&mut self, order_id: &OrderId) -> Option<RestingLocation> {
        self.entries.remove(order_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
