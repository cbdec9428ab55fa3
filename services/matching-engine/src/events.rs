//! Results emitted by the matching engine
//!
//! Every accepted operation produces an `ExecutionReport` describing the
//! fills it caused and what happened to the order afterwards.

use serde::{Deserialize, Serialize};
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::trade::Trade;

/// What happened to the order once matching finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderOutcome {
    /// Fully filled on arrival
    Filled,
    /// Residual quantity now rests on the book
    Resting { price: Price, priority: u64, remaining: Quantity },
    /// Market order remainder that found no liquidity and was dropped
    Unfilled { discarded: Quantity },
    /// Resting order removed by cancel
    Canceled { remaining: Quantity },
}

/// Report for one processed order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub symbol: Symbol,
    /// Id of the order (engine-assigned if the caller left it empty)
    pub order_id: OrderId,
    pub trades: Vec<Trade>,
    /// Sum of trade quantities
    pub filled: Quantity,
    pub outcome: OrderOutcome,
}

impl ExecutionReport {
    pub fn is_resting(&self) -> bool {
        matches!(self.outcome, OrderOutcome::Resting { .. })
    }

    /// Volume-weighted fill price, None without fills or if the notional overflows
    pub fn average_price(&self) -> Option<rust_decimal::Decimal> {
        if self.filled.is_zero() {
            return None;
        }
        let notional = self
            .trades
            .iter()
            .try_fold(rust_decimal::Decimal::ZERO, |acc, trade| acc.checked_add(trade.trade_value()?))?;
        notional.checked_div(self.filled.as_decimal())
    }
}

/// Summary of a snapshot replacing a symbol's ladders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotApplied {
    pub symbol: Symbol,
    pub bid_entries: usize,
    pub ask_entries: usize,
    /// Internally resting orders dropped by the replacement
    pub displaced_orders: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::order::Side;

    fn trade(seq: u64, price: &str, qty: &str) -> Trade {
        Trade {
            sequence: seq,
            symbol: Symbol::new("AAPL"),
            maker_order_id: None,
            taker_order_id: OrderId::new("T1"),
            side: Side::Buy,
            price: price.parse().unwrap(),
            quantity: qty.parse().unwrap(),
            executed_at: seq,
        }
    }

    #[test]
    fn test_average_price_is_volume_weighted() {
        let report = ExecutionReport {
            symbol: Symbol::new("AAPL"),
            order_id: OrderId::new("T1"),
            trades: vec![trade(1, "150.01", "50"), trade(2, "150.02", "150")],
            filled: "200".parse().unwrap(),
            outcome: OrderOutcome::Filled,
        };
        // (7500.50 + 22503.00) / 200
        assert_eq!(
            report.average_price(),
            Some(rust_decimal::Decimal::new(15001750, 5))
        );
        assert!(!report.is_resting());
    }

    #[test]
    fn test_average_price_overflowing_notional_is_none() {
        let report = ExecutionReport {
            symbol: Symbol::new("AAPL"),
            order_id: OrderId::new("T1"),
            trades: vec![trade(1, "1000000000000000", "100000000000000000")],
            filled: "100000000000000000".parse().unwrap(),
            outcome: OrderOutcome::Filled,
        };
        assert_eq!(report.average_price(), None);
    }

    #[test]
    fn test_outcome_json_is_tagged() {
        let outcome = OrderOutcome::Resting {
            price: "150.01".parse().unwrap(),
            priority: 7,
            remaining: "50".parse().unwrap(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "RESTING");
        assert_eq!(json["priority"], 7);

        let unfilled: OrderOutcome =
            serde_json::from_str(r#"{"outcome": "UNFILLED", "discarded": "5"}"#).unwrap();
        assert_eq!(unfilled, OrderOutcome::Unfilled { discarded: "5".parse().unwrap() });
    }
}
