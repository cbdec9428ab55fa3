//! Trade execution types

use crate::ids::{OrderId, Symbol};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single fill between an aggressive order and a resting entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Per-symbol monotonic trade sequence
    pub sequence: u64,
    pub symbol: Symbol,

    /// Resting order; None when the liquidity came from an external snapshot
    pub maker_order_id: Option<OrderId>,
    pub taker_order_id: OrderId,

    /// Aggressor side
    pub side: Side,
    /// Execution price (the resting entry's price)
    pub price: Price,
    pub quantity: Quantity,

    pub executed_at: u64, // Unix nanos
}

impl Trade {
    /// Calculate trade value (price × quantity), None if it overflows
    pub fn trade_value(&self) -> Option<Decimal> {
        self.quantity.as_decimal().checked_mul(self.price.as_decimal())
    }
}
