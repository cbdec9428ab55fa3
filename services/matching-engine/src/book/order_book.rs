//! Per-symbol order book
//!
//! Owns one symbol's bid and ask ladders, its order registry, the priority
//! counter and the trade sequence. Nothing here is shared with other symbols,
//! so a book can be moved to whichever worker owns the symbol.
//!
//! **Invariants** (checked by `check_invariants`):
//! - bids descending by price, asks ascending, priority ascending within a level
//! - every resting entry has remaining quantity > 0
//! - best bid < best ask whenever both sides are non-empty
//! - the registry lists exactly the resting entries that carry an order id
//! - each side's total resting quantity fits in a `Decimal`; orders that could
//!   break this are refused before they touch the ladders

use types::errors::BookError;
use types::ids::{OrderId, Symbol};
use types::market::MarketSnapshot;
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderKind, Side};
use types::trade::Trade;

use super::{AskBook, BidBook, LevelEntry};
use crate::events::{ExecutionReport, OrderOutcome, SnapshotApplied};
use crate::matching::{crossing, MatchExecutor};
use crate::registry::{OrderRegistry, RestingLocation};

/// Order book for a single symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBook {
    symbol: Symbol,
    bids: BidBook,
    asks: AskBook,
    registry: OrderRegistry,
    /// Trade executor with sequence generation
    executor: MatchExecutor,
    /// Rank handed to the next entry that rests
    next_priority: u64,
    /// Counter for engine-assigned order ids
    next_assigned_id: u64,
    last_trade_price: Option<Price>,
    last_update: u64,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: BidBook::new(),
            asks: AskBook::new(),
            registry: OrderRegistry::new(),
            executor: MatchExecutor::new(1),
            next_priority: 1,
            next_assigned_id: 1,
            last_trade_price: None,
            last_update: 0,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn bids(&self) -> &BidBook {
        &self.bids
    }

    pub fn asks(&self) -> &AskBook {
        &self.asks
    }

    pub fn registry(&self) -> &OrderRegistry {
        &self.registry
    }

    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.bids.best_bid()
    }

    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.asks.best_ask()
    }

    pub fn last_trade_price(&self) -> Option<Price> {
        self.last_trade_price
    }

    pub fn last_update(&self) -> u64 {
        self.last_update
    }

    /// Rank the next resting entry will receive
    pub fn next_priority(&self) -> u64 {
        self.next_priority
    }

    pub fn is_crossed(&self) -> bool {
        match (self.bids.best_bid_price(), self.asks.best_ask_price()) {
            (Some(bid), Some(ask)) => crossing::can_match(bid, ask),
            _ => false,
        }
    }

    /// Apply one order request to the book
    ///
    /// On error the book is left exactly as it was.
    pub fn process_order(&mut self, mut order: Order) -> Result<ExecutionReport, BookError> {
        order.validate()?;
        if order.symbol != self.symbol {
            return Err(BookError::invalid_order(format!(
                "order for {} routed to {} book",
                order.symbol, self.symbol
            )));
        }
        self.check_timestamp(order.timestamp)?;

        let report = match order.kind {
            OrderKind::Limit => {
                self.assign_id(&mut order);
                if self.registry.contains(&order.order_id) {
                    return Err(BookError::invalid_order(format!(
                        "order id {} is already resting",
                        order.order_id
                    )));
                }
                self.check_capacity(order.side, order.quantity)?;
                self.process_limit(order)
            }
            OrderKind::Market => {
                self.assign_id(&mut order);
                self.process_market(order)
            }
            OrderKind::Cancel => self.process_cancel(&order)?,
            OrderKind::Modify => self.process_modify(order)?,
        };

        debug_assert!(!self.is_crossed(), "book crossed after processing an order");
        Ok(report)
    }

    /// Replace both ladders with an external snapshot
    ///
    /// Internally resting orders are dropped from the registry along with the
    /// ladders they lived in.
    pub fn apply_snapshot(&mut self, snapshot: &MarketSnapshot) -> Result<SnapshotApplied, BookError> {
        snapshot.validate()?;
        if snapshot.symbol != self.symbol {
            return Err(BookError::invalid_snapshot(format!(
                "snapshot for {} routed to {} book",
                snapshot.symbol, self.symbol
            )));
        }
        if snapshot.timestamp < self.last_update {
            return Err(BookError::invalid_snapshot(format!(
                "timestamp {} precedes last update {}",
                snapshot.timestamp, self.last_update
            )));
        }

        let displaced_orders = self.registry.len();
        self.bids.clear();
        self.asks.clear();
        self.registry.clear();

        let mut bids: Vec<_> = snapshot.bids.iter().collect();
        bids.sort_by_key(|level| level.priority);
        for level in bids {
            let entry = self.snapshot_entry(level.quantity);
            self.bids.insert(level.price, entry);
        }

        let mut asks: Vec<_> = snapshot.asks.iter().collect();
        asks.sort_by_key(|level| level.priority);
        for level in asks {
            let entry = self.snapshot_entry(level.quantity);
            self.asks.insert(level.price, entry);
        }

        self.last_trade_price = if snapshot.last_trade_price.is_zero() {
            None
        } else {
            Some(snapshot.last_trade_price)
        };
        self.last_update = snapshot.timestamp;

        Ok(SnapshotApplied {
            symbol: self.symbol.clone(),
            bid_entries: snapshot.bids.len(),
            ask_entries: snapshot.asks.len(),
            displaced_orders,
        })
    }

    /// Resting entries of one side, best-first in matching order
    pub fn resting_entries(&self, side: Side) -> Vec<(Price, LevelEntry)> {
        let flatten = |(price, level): (Price, &super::PriceLevel)| {
            level.entries().map(move |entry| (price, entry.clone())).collect::<Vec<_>>()
        };
        match side {
            Side::Buy => self.bids.levels().flat_map(flatten).collect(),
            Side::Sell => self.asks.levels().flat_map(flatten).collect(),
        }
    }

    /// Verify the structural invariants listed in the module docs
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.is_crossed() {
            return Err(format!("{} book is crossed", self.symbol));
        }

        let mut tagged = 0usize;
        for side in [Side::Buy, Side::Sell] {
            let entries = self.resting_entries(side);
            for pair in entries.windows(2) {
                let (prev_price, prev) = &pair[0];
                let (price, entry) = &pair[1];
                let price_ok = match side {
                    Side::Buy => price <= prev_price,
                    Side::Sell => price >= prev_price,
                };
                if !price_ok {
                    return Err(format!("{} ladder out of price order at {}", side, price));
                }
                if price == prev_price && entry.priority <= prev.priority {
                    return Err(format!("{} ladder out of priority order at {}", side, price));
                }
            }

            for (price, entry) in &entries {
                if entry.remaining.is_zero() {
                    return Err(format!("empty entry resting at {}", price));
                }
                if entry.priority >= self.next_priority {
                    return Err(format!("entry at {} has unissued rank {}", price, entry.priority));
                }
                if let Some(id) = &entry.order_id {
                    tagged += 1;
                    let expected = RestingLocation {
                        side,
                        price: *price,
                        priority: entry.priority,
                    };
                    if self.registry.get(id) != Some(&expected) {
                        return Err(format!("registry disagrees with ladder for {}", id));
                    }
                }
            }
        }

        if tagged != self.registry.len() {
            return Err(format!(
                "registry holds {} orders but ladders hold {}",
                self.registry.len(),
                tagged
            ));
        }
        Ok(())
    }

    fn process_limit(&mut self, order: Order) -> ExecutionReport {
        let (trades, remaining) = self.take_liquidity(
            &order.order_id,
            order.side,
            Some(order.price),
            order.quantity,
            order.timestamp,
        );
        let filled = order.quantity.saturating_sub(remaining);

        let outcome = if remaining.is_zero() {
            OrderOutcome::Filled
        } else {
            let priority = self.rest(order.order_id.clone(), order.side, order.price, remaining);
            OrderOutcome::Resting {
                price: order.price,
                priority,
                remaining,
            }
        };
        self.last_update = order.timestamp;

        ExecutionReport {
            symbol: self.symbol.clone(),
            order_id: order.order_id,
            trades,
            filled,
            outcome,
        }
    }

    fn process_market(&mut self, order: Order) -> ExecutionReport {
        let (trades, remaining) =
            self.take_liquidity(&order.order_id, order.side, None, order.quantity, order.timestamp);
        let filled = order.quantity.saturating_sub(remaining);

        // A market order never rests
        let outcome = if remaining.is_zero() {
            OrderOutcome::Filled
        } else {
            OrderOutcome::Unfilled { discarded: remaining }
        };
        self.last_update = order.timestamp;

        ExecutionReport {
            symbol: self.symbol.clone(),
            order_id: order.order_id,
            trades,
            filled,
            outcome,
        }
    }

    fn process_cancel(&mut self, order: &Order) -> Result<ExecutionReport, BookError> {
        let location = self
            .registry
            .remove(&order.order_id)
            .ok_or_else(|| self.unknown_order(&order.order_id))?;

        let removed = match location.side {
            Side::Buy => self.bids.remove(&order.order_id, location.price),
            Side::Sell => self.asks.remove(&order.order_id, location.price),
        };
        let entry = removed.ok_or_else(|| self.unknown_order(&order.order_id))?;
        self.last_update = order.timestamp;

        Ok(ExecutionReport {
            symbol: self.symbol.clone(),
            order_id: order.order_id.clone(),
            trades: Vec::new(),
            filled: Quantity::zero(),
            outcome: OrderOutcome::Canceled {
                remaining: entry.remaining,
            },
        })
    }

    /// Cancel the old entry then insert the new terms at the back of the queue
    fn process_modify(&mut self, order: Order) -> Result<ExecutionReport, BookError> {
        if !self.registry.contains(&order.order_id) {
            return Err(self.unknown_order(&order.order_id));
        }
        // The old entry's quantity is not credited back
        self.check_capacity(order.side, order.quantity)?;
        self.process_cancel(&order)?;
        let replacement = Order {
            kind: OrderKind::Limit,
            ..order
        };
        Ok(self.process_limit(replacement))
    }

    /// Consume opposite-side liquidity in price-time order
    ///
    /// Returns the trades and the unfilled remainder.
    fn take_liquidity(
        &mut self,
        taker_id: &OrderId,
        side: Side,
        limit: Option<Price>,
        quantity: Quantity,
        timestamp: u64,
    ) -> (Vec<Trade>, Quantity) {
        let mut trades = Vec::new();
        let mut remaining = quantity;

        while !remaining.is_zero() {
            let best = match side {
                Side::Buy => self.asks.best_level_mut(),
                Side::Sell => self.bids.best_level_mut(),
            };
            let Some((price, level)) = best else {
                break;
            };
            if !crossing::incoming_can_match(side, limit, price) {
                break;
            }
            let Some((maker, filled)) = level.fill_front(remaining) else {
                break;
            };

            match side {
                Side::Buy => self.asks.remove_level_if_empty(price),
                Side::Sell => self.bids.remove_level_if_empty(price),
            }
            if filled == maker.remaining {
                if let Some(maker_id) = &maker.order_id {
                    self.registry.remove(maker_id);
                }
            }

            remaining = remaining.saturating_sub(filled);
            trades.push(self.executor.execute_trade(
                &self.symbol,
                maker.order_id,
                taker_id,
                side,
                price,
                filled,
                timestamp,
            ));
            self.last_trade_price = Some(price);
        }

        (trades, remaining)
    }

    fn rest(&mut self, order_id: OrderId, side: Side, price: Price, remaining: Quantity) -> u64 {
        let priority = self.take_priority();
        let entry = LevelEntry {
            order_id: Some(order_id.clone()),
            priority,
            remaining,
        };
        match side {
            Side::Buy => self.bids.insert(price, entry),
            Side::Sell => self.asks.insert(price, entry),
        }
        let inserted = self.registry.insert(order_id, RestingLocation { side, price, priority });
        debug_assert!(inserted, "resting id collided with a live order");
        priority
    }

    fn snapshot_entry(&mut self, quantity: Quantity) -> LevelEntry {
        LevelEntry {
            order_id: None,
            priority: self.take_priority(),
            remaining: quantity,
        }
    }

    fn take_priority(&mut self) -> u64 {
        let priority = self.next_priority;
        self.next_priority += 1;
        priority
    }

    /// Give an id-less order the next free `<symbol>#<n>` id
    fn assign_id(&mut self, order: &mut Order) {
        if !order.order_id.is_unassigned() {
            return;
        }
        loop {
            let candidate = OrderId::new(format!("{}#{}", self.symbol, self.next_assigned_id));
            self.next_assigned_id += 1;
            if !self.registry.contains(&candidate) {
                order.order_id = candidate;
                return;
            }
        }
    }

    /// Refuse a quantity whose residual could overflow the side's resting total
    fn check_capacity(&self, side: Side, quantity: Quantity) -> Result<(), BookError> {
        let resting = match side {
            Side::Buy => self.bids.resting_quantity(),
            Side::Sell => self.asks.resting_quantity(),
        };
        if resting.checked_add(quantity).is_none() {
            return Err(BookError::invalid_order(format!(
                "{} side resting quantity would overflow",
                side
            )));
        }
        Ok(())
    }

    fn check_timestamp(&self, timestamp: u64) -> Result<(), BookError> {
        if timestamp < self.last_update {
            return Err(BookError::invalid_order(format!(
                "timestamp {} precedes last update {}",
                timestamp, self.last_update
            )));
        }
        Ok(())
    }

    fn unknown_order(&self, order_id: &OrderId) -> BookError {
        BookError::UnknownOrder {
            symbol: self.symbol.clone(),
            order_id: order_id.clone(),
        }
    }
}
