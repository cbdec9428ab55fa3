//! What-if market impact simulation
//!
//! Walks the opposite ladder best-first the way a market order would, without
//! touching the book.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::numeric::{Price, Quantity};
use types::order::Side;

use matching_engine::book::PriceLevel;
use matching_engine::OrderBook;

use crate::history::ImpactRecord;
use crate::metrics;

/// Outcome of a simulated sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketImpact {
    pub side: Side,
    pub requested: Quantity,
    /// Quantity available within current depth, capped at `requested`
    pub fillable: Quantity,
    /// fillable / requested
    pub fill_ratio: Decimal,
    /// Volume-weighted execution price of the fillable part
    pub execution_price: Option<Decimal>,
    /// execution_price - mid; None without fills or without a two-sided book
    pub price_impact: Option<Decimal>,
}

impl MarketImpact {
    pub fn to_record(&self, timestamp: u64) -> ImpactRecord {
        ImpactRecord {
            timestamp,
            quantity: self.requested,
            side: self.side,
            fill_ratio: self.fill_ratio,
            price_impact: self.price_impact,
        }
    }
}

/// Filled quantity and notional from taking `quantity` off levels best-first
///
/// Depth whose notional would overflow counts as unfillable and ends the walk.
fn sweep<'a>(levels: impl Iterator<Item = (Price, &'a PriceLevel)>, quantity: Decimal) -> (Decimal, Decimal) {
    let mut remaining = quantity;
    let mut filled = Decimal::ZERO;
    let mut notional = Decimal::ZERO;
    for (price, level) in levels {
        if remaining.is_zero() {
            break;
        }
        let take = remaining.min(level.total_quantity().as_decimal());
        let Some(next_notional) = take
            .checked_mul(price.as_decimal())
            .and_then(|cost| notional.checked_add(cost))
        else {
            break;
        };
        // take <= remaining <= quantity, so filled never exceeds the request
        filled += take;
        notional = next_notional;
        remaining -= take;
    }
    (filled, notional)
}

/// Simulate sweeping `quantity` from the side opposite `side`
///
/// A missing book behaves like an empty one. `quantity` must be non-zero.
pub fn simulate(book: Option<&OrderBook>, quantity: Quantity, side: Side) -> MarketImpact {
    let (filled, notional) = match (book, side) {
        (Some(book), Side::Buy) => sweep(book.asks().levels(), quantity.as_decimal()),
        (Some(book), Side::Sell) => sweep(book.bids().levels(), quantity.as_decimal()),
        (None, _) => (Decimal::ZERO, Decimal::ZERO),
    };

    let execution_price = if filled.is_zero() {
        None
    } else {
        notional.checked_div(filled)
    };
    let mid = book.and_then(|b| metrics::mid_price(b).ok());
    let price_impact = match (execution_price, mid) {
        (Some(vwap), Some(mid)) => Some(vwap - mid),
        _ => None,
    };
    let fill_ratio = if quantity.is_zero() {
        Decimal::ZERO
    } else {
        filled / quantity.as_decimal()
    };

    MarketImpact {
        side,
        requested: quantity,
        fillable: Quantity::try_new(filled).unwrap_or_else(Quantity::zero),
        fill_ratio,
        execution_price,
        price_impact,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::Symbol;
    use types::market::{MarketSnapshot, SnapshotLevel};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    fn aapl_book() -> OrderBook {
        let level = |p: &str, q: &str, r| SnapshotLevel::new(p.parse().unwrap(), q.parse().unwrap(), r);
        let mut book = OrderBook::new(Symbol::new("AAPL"));
        book.apply_snapshot(&MarketSnapshot {
            symbol: Symbol::new("AAPL"),
            bids: vec![level("150.00", "100", 0), level("149.99", "150", 1)],
            asks: vec![level("150.01", "100", 0), level("150.02", "130", 1)],
            last_trade_price: "150.00".parse().unwrap(),
            timestamp: 1,
        })
        .unwrap();
        book
    }

    #[test]
    fn test_buy_within_first_level() {
        let book = aapl_book();
        let impact = simulate(Some(&book), "50".parse().unwrap(), Side::Buy);

        assert_eq!(impact.fill_ratio, Decimal::ONE);
        assert_eq!(impact.execution_price, Some(dec("150.01")));
        assert_eq!(impact.price_impact, Some(dec("0.005")));
    }

    #[test]
    fn test_buy_walks_two_levels() {
        let book = aapl_book();
        let impact = simulate(Some(&book), "200".parse().unwrap(), Side::Buy);

        // 100 @ 150.01 + 100 @ 150.02
        assert_eq!(impact.execution_price, Some(dec("150.015")));
        assert_eq!(impact.price_impact, Some(dec("0.010")));
    }

    #[test]
    fn test_sell_impact_is_negative() {
        let book = aapl_book();
        let impact = simulate(Some(&book), "100".parse().unwrap(), Side::Sell);
        assert_eq!(impact.price_impact, Some(dec("-0.005")));
    }

    #[test]
    fn test_partial_fill_ratio() {
        let book = aapl_book();
        let impact = simulate(Some(&book), "460".parse().unwrap(), Side::Buy);
        assert_eq!(impact.fillable, "230".parse().unwrap());
        assert_eq!(impact.fill_ratio, dec("0.5"));
    }

    #[test]
    fn test_simulation_does_not_mutate() {
        let book = aapl_book();
        let before = book.clone();
        simulate(Some(&book), "1000".parse().unwrap(), Side::Buy);
        assert_eq!(book, before);
    }

    #[test]
    fn test_overflowing_depth_is_unfillable() {
        let level = |p: &str, q: &str, r| SnapshotLevel::new(p.parse().unwrap(), q.parse().unwrap(), r);
        let mut book = OrderBook::new(Symbol::new("BIG"));
        book.apply_snapshot(&MarketSnapshot {
            symbol: Symbol::new("BIG"),
            bids: vec![level("1", "10", 0)],
            asks: vec![
                level("2", "10", 0),
                level("1000000000000000", "100000000000000", 1),
            ],
            last_trade_price: Price::zero(),
            timestamp: 1,
        })
        .unwrap();

        let impact = simulate(Some(&book), "100000000000010".parse().unwrap(), Side::Buy);
        assert_eq!(impact.fillable, "10".parse().unwrap());
        assert_eq!(impact.execution_price, Some(dec("2")));
        assert!(impact.fill_ratio < Decimal::ONE);
    }

    #[test]
    fn test_missing_book() {
        let impact = simulate(None, "10".parse().unwrap(), Side::Buy);
        assert_eq!(impact.fill_ratio, Decimal::ZERO);
        assert_eq!(impact.execution_price, None);
        assert_eq!(impact.price_impact, None);
    }
}
