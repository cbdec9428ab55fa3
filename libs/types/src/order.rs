//! Order request types
//!
//! An `Order` is a request against one symbol's book: a new limit or market
//! order, a cancel of a resting limit order, or a modify (cancel + re-insert).

use crate::errors::BookError;
use crate::ids::{OrderId, Symbol};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of request carried by an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    /// Rest any residual at `price` after crossing
    Limit,
    /// Take liquidity at any price; the residual is discarded
    Market,
    /// Remove a resting limit order
    Cancel,
    /// Cancel a resting limit order and re-insert it with new price/quantity
    Modify,
}

/// Inbound order request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub kind: OrderKind,
    pub side: Side,
    /// Limit price; ignored for MARKET and CANCEL
    pub price: Price,
    /// Requested quantity; ignored for CANCEL
    pub quantity: Quantity,
    /// Arrival time, Unix nanos
    pub timestamp: u64,
}

impl Order {
    pub fn limit(
        order_id: impl Into<OrderId>,
        symbol: impl Into<Symbol>,
        side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: u64,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            symbol: symbol.into(),
            kind: OrderKind::Limit,
            side,
            price,
            quantity,
            timestamp,
        }
    }

    pub fn market(
        order_id: impl Into<OrderId>,
        symbol: impl Into<Symbol>,
        side: Side,
        quantity: Quantity,
        timestamp: u64,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            symbol: symbol.into(),
            kind: OrderKind::Market,
            side,
            price: Price::zero(),
            quantity,
            timestamp,
        }
    }

    pub fn cancel(order_id: impl Into<OrderId>, symbol: impl Into<Symbol>, timestamp: u64) -> Self {
        Self {
            order_id: order_id.into(),
            symbol: symbol.into(),
            kind: OrderKind::Cancel,
            side: Side::Buy,
            price: Price::zero(),
            quantity: Quantity::zero(),
            timestamp,
        }
    }

    /// Replace the resting order `order_id` with a new side/price/quantity.
    /// The replacement always joins the back of the queue.
    pub fn modify(
        order_id: impl Into<OrderId>,
        symbol: impl Into<Symbol>,
        side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: u64,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            symbol: symbol.into(),
            kind: OrderKind::Modify,
            side,
            price,
            quantity,
            timestamp,
        }
    }

    /// Check the request's own fields, independent of book state
    pub fn validate(&self) -> Result<(), BookError> {
        if self.symbol.is_empty() {
            return Err(BookError::invalid_order("empty symbol"));
        }

        match self.kind {
            OrderKind::Limit | OrderKind::Modify => {
                if self.quantity.is_zero() {
                    return Err(BookError::invalid_order("quantity must be positive"));
                }
                if self.price.is_zero() {
                    return Err(BookError::invalid_order("limit price must be positive"));
                }
            }
            OrderKind::Market => {
                if self.quantity.is_zero() {
                    return Err(BookError::invalid_order("quantity must be positive"));
                }
            }
            OrderKind::Cancel => {}
        }

        if matches!(self.kind, OrderKind::Cancel | OrderKind::Modify) && self.order_id.is_unassigned() {
            return Err(BookError::invalid_order("cancel/modify must reference an order id"));
        }

        Ok(())
    }

    /// Signed quantity from the position's point of view (+ buy, - sell)
    pub fn signed_quantity(&self) -> rust_decimal::Decimal {
        match self.side {
            Side::Buy => self.quantity.as_decimal(),
            Side::Sell => -self.quantity.as_decimal(),
        }
    }
}
