//! Microstructure metrics
//!
//! Instantaneous metrics are pure functions of one book's ladders. Windowed
//! statistics are pure functions of history slices. Nothing here mutates.

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use types::errors::BookError;
use types::numeric::{Price, Quantity};
use types::order::Side;

use matching_engine::OrderBook;

use crate::history::{Metric, MetricSample, TradePrint};

/// Best bid and best ask, or `InsufficientLiquidity` naming the empty side
fn top_of_book(book: &OrderBook) -> Result<((Price, Quantity), (Price, Quantity)), BookError> {
    let bid = book.best_bid().ok_or_else(|| BookError::InsufficientLiquidity {
        symbol: book.symbol().clone(),
        side: Side::Buy.as_str(),
    })?;
    let ask = book.best_ask().ok_or_else(|| BookError::InsufficientLiquidity {
        symbol: book.symbol().clone(),
        side: Side::Sell.as_str(),
    })?;
    Ok((bid, ask))
}

/// Best ask minus best bid
pub fn spread(book: &OrderBook) -> Result<Decimal, BookError> {
    let ((bid, _), (ask, _)) = top_of_book(book)?;
    Ok(ask.as_decimal() - bid.as_decimal())
}

/// Midpoint of two non-negative prices
pub fn midpoint(a: Decimal, b: Decimal) -> Decimal {
    match a.checked_add(b) {
        Some(sum) => sum / Decimal::TWO,
        None => {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            low + (high - low) / Decimal::TWO
        }
    }
}

pub fn mid_price(book: &OrderBook) -> Result<Decimal, BookError> {
    let ((bid, _), (ask, _)) = top_of_book(book)?;
    Ok(midpoint(bid.as_decimal(), ask.as_decimal()))
}

/// Mid weighted toward the side with less displayed size
pub fn micro_price(book: &OrderBook) -> Result<Decimal, BookError> {
    let ((bid_px, bid_qty), (ask_px, ask_qty)) = top_of_book(book)?;
    let (bp, bq) = (bid_px.as_decimal(), bid_qty.as_decimal());
    let (ap, aq) = (ask_px.as_decimal(), ask_qty.as_decimal());

    // Resting entries are strictly positive so the total is too
    let weighted = bp
        .checked_mul(aq)
        .zip(ap.checked_mul(bq))
        .and_then(|(left, right)| left.checked_add(right))
        .zip(bq.checked_add(aq))
        .and_then(|(numerator, total)| numerator.checked_div(total));

    // Same value as bid + spread * bid share; the share stays within [0, 1]
    Ok(weighted.unwrap_or_else(|| bp + (ap - bp) * bid_share(bq, aq)))
}

/// a / (a + b) for non-negative a and b with a positive sum
fn bid_share(a: Decimal, b: Decimal) -> Decimal {
    match a.checked_add(b) {
        Some(total) => a / total,
        None => (a / Decimal::TEN) / (a / Decimal::TEN + b / Decimal::TEN),
    }
}

/// (a - b) / (a + b) for non-negative a and b; 0 when both are zero
pub(crate) fn normalized_difference(a: Decimal, b: Decimal) -> Decimal {
    match a.checked_add(b) {
        Some(total) if total.is_zero() => Decimal::ZERO,
        Some(total) => (a - b) / total,
        None => {
            let (a, b) = (a / Decimal::TEN, b / Decimal::TEN);
            (a - b) / (a + b)
        }
    }
}

/// (bid - ask) / (bid + ask) volume over the top `depth` levels; 0 when both are empty
pub fn volume_imbalance(book: &OrderBook, depth: usize) -> Decimal {
    let bid = book.bids().total_quantity(depth).as_decimal();
    let ask = book.asks().total_quantity(depth).as_decimal();
    normalized_difference(bid, ask)
}

/// Quantity over the top `depth` levels of both sides, None if the sum overflows
pub fn visible_depth(book: &OrderBook, depth: usize) -> Option<Decimal> {
    let bid = book.bids().total_quantity(depth).as_decimal();
    let ask = book.asks().total_quantity(depth).as_decimal();
    bid.checked_add(ask)
}

/// Metrics computed after every mutation; undefined values stay None
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantaneousMetrics {
    pub spread: Option<Decimal>,
    pub mid_price: Option<Decimal>,
    pub micro_price: Option<Decimal>,
    pub volume_imbalance: Decimal,
    pub depth: Option<Decimal>,
    pub last_trade_price: Option<Decimal>,
}

impl InstantaneousMetrics {
    pub fn compute(book: &OrderBook, imbalance_depth: usize) -> Self {
        Self {
            spread: spread(book).ok(),
            mid_price: mid_price(book).ok(),
            micro_price: micro_price(book).ok(),
            volume_imbalance: volume_imbalance(book, imbalance_depth),
            depth: visible_depth(book, imbalance_depth),
            last_trade_price: book.last_trade_price().map(|p| p.as_decimal()),
        }
    }

    /// Defined metrics paired with their series
    pub fn defined(&self) -> Vec<(Metric, Decimal)> {
        [
            (Metric::Spread, self.spread),
            (Metric::MidPrice, self.mid_price),
            (Metric::MicroPrice, self.micro_price),
            (Metric::VolumeImbalance, Some(self.volume_imbalance)),
            (Metric::Depth, self.depth),
            (Metric::LastTradePrice, self.last_trade_price),
        ]
        .into_iter()
        .filter_map(|(metric, value)| value.map(|v| (metric, v)))
        .collect()
    }
}

pub(crate) fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
}

/// Arithmetic mean, None for no values
///
/// Falls back to summing `value / n` when the plain sum overflows; that sum
/// is bounded by the largest magnitude.
pub(crate) fn mean_of(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let n = Decimal::from(values.len());
    match checked_sum(values.iter().copied()) {
        Some(sum) => Some(sum / n),
        None => checked_sum(values.iter().map(|value| *value / n)),
    }
}

/// Arithmetic mean of sample values
pub fn mean(samples: &[MetricSample]) -> Option<Decimal> {
    let values: Vec<Decimal> = samples.iter().map(|s| s.value).collect();
    mean_of(&values)
}

/// Sample standard deviation of simple returns between consecutive samples
///
/// Needs at least three samples (two returns).
pub fn historical_volatility(samples: &[MetricSample]) -> Result<Decimal, BookError> {
    const METRIC: &str = "historical_volatility";

    let returns = samples
        .windows(2)
        .filter(|pair| !pair[0].value.is_zero())
        .map(|pair| {
            (pair[1].value - pair[0].value)
                .checked_div(pair[0].value)
                .ok_or_else(|| BookError::overflow(METRIC))
        })
        .collect::<Result<Vec<Decimal>, BookError>>()?;

    if returns.len() < 2 {
        return Err(BookError::insufficient_history(METRIC, 3, samples.len()));
    }

    let mean = mean_of(&returns).ok_or_else(|| BookError::overflow(METRIC))?;
    let squares = returns
        .iter()
        .map(|r| r.checked_sub(mean).and_then(|d| d.checked_mul(d)))
        .collect::<Option<Vec<Decimal>>>()
        .ok_or_else(|| BookError::overflow(METRIC))?;
    let variance = checked_sum(squares)
        .ok_or_else(|| BookError::overflow(METRIC))?
        / (Decimal::from(returns.len()) - Decimal::ONE);

    Ok(variance.sqrt().unwrap_or(Decimal::ZERO))
}

/// Execution cost of recent trades against the mid quoted before each one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveSpread {
    /// Mean of |price - mid|
    pub mean_absolute: Decimal,
    /// Mean of |price - mid| / mid
    pub relative: Decimal,
    pub trades: usize,
}

pub fn effective_spread(prints: &[TradePrint]) -> Result<EffectiveSpread, BookError> {
    const METRIC: &str = "effective_spread";

    if prints.is_empty() {
        return Err(BookError::insufficient_history("trade_prints", 1, 0));
    }
    let deviations: Vec<Decimal> = prints
        .iter()
        .map(|print| (print.price.as_decimal() - print.mid).abs())
        .collect();
    let relatives = prints
        .iter()
        .zip(&deviations)
        .map(|(print, deviation)| {
            if print.mid.is_zero() {
                Some(Decimal::ZERO)
            } else {
                deviation.checked_div(print.mid)
            }
        })
        .collect::<Option<Vec<Decimal>>>()
        .ok_or_else(|| BookError::overflow(METRIC))?;

    Ok(EffectiveSpread {
        mean_absolute: mean_of(&deviations).ok_or_else(|| BookError::overflow(METRIC))?,
        relative: mean_of(&relatives).ok_or_else(|| BookError::overflow(METRIC))?,
        trades: prints.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::Symbol;
    use types::market::{MarketSnapshot, SnapshotLevel};
    use types::order::Order;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    fn level(price: &str, qty: &str, priority: u64) -> SnapshotLevel {
        SnapshotLevel::new(price.parse().unwrap(), qty.parse().unwrap(), priority)
    }

    fn aapl_book() -> OrderBook {
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

    fn sample(value: &str) -> MetricSample {
        MetricSample {
            timestamp: 0,
            value: dec(value),
        }
    }

    #[test]
    fn test_spread_and_mid() {
        let book = aapl_book();
        assert_eq!(spread(&book).unwrap(), dec("0.01"));
        assert_eq!(mid_price(&book).unwrap(), dec("150.005"));
    }

    #[test]
    fn test_micro_price_equal_sizes_is_mid() {
        let book = aapl_book();
        assert_eq!(micro_price(&book).unwrap(), dec("150.005"));
    }

    #[test]
    fn test_micro_price_leans_toward_thin_side() {
        let mut book = aapl_book();
        // Take 80 off the ask: 20 left at 150.01 against 100 bid
        book.process_order(Order::market("M", "AAPL", Side::Buy, "80".parse().unwrap(), 2))
            .unwrap();
        let micro = micro_price(&book).unwrap();
        // (150.00 * 20 + 150.01 * 100) / 120
        assert_eq!(micro, (dec("3000.00") + dec("15001.00")) / dec("120"));
        assert!(micro > mid_price(&book).unwrap());
    }

    #[test]
    fn test_empty_side_is_insufficient_liquidity() {
        let mut book = OrderBook::new(Symbol::new("AAPL"));
        book.process_order(Order::limit("B", "AAPL", Side::Buy, "1".parse().unwrap(), "1".parse().unwrap(), 1))
            .unwrap();

        assert_eq!(
            spread(&book),
            Err(BookError::InsufficientLiquidity {
                symbol: Symbol::new("AAPL"),
                side: "SELL",
            })
        );
        assert!(mid_price(&book).is_err());
        assert!(micro_price(&book).is_err());
    }

    #[test]
    fn test_volume_imbalance() {
        let book = aapl_book();
        // bids 250, asks 230
        assert_eq!(volume_imbalance(&book, 5), dec("20") / dec("480"));
        assert_eq!(volume_imbalance(&book, 1), Decimal::ZERO);
        assert_eq!(volume_imbalance(&OrderBook::new(Symbol::new("X")), 5), Decimal::ZERO);
    }

    #[test]
    fn test_instantaneous_skips_undefined() {
        let book = OrderBook::new(Symbol::new("AAPL"));
        let metrics = InstantaneousMetrics::compute(&book, 5);
        let defined: Vec<Metric> = metrics.defined().into_iter().map(|(m, _)| m).collect();
        assert_eq!(defined, vec![Metric::VolumeImbalance, Metric::Depth]);
    }

    #[test]
    fn test_historical_volatility() {
        // Returns: +0.01, -0.01
        let samples = [sample("100"), sample("101"), sample("99.99")];
        let vol = historical_volatility(&samples).unwrap();
        let expected = dec("0.0002").sqrt().unwrap();
        assert_eq!(vol.round_dp(12), expected.round_dp(12));
    }

    #[test]
    fn test_historical_volatility_constant_series() {
        let samples = [sample("100"), sample("100"), sample("100")];
        assert_eq!(historical_volatility(&samples).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_historical_volatility_needs_two_returns() {
        assert!(historical_volatility(&[sample("100"), sample("101")]).is_err());
    }

    #[test]
    fn test_effective_spread() {
        let prints = vec![
            TradePrint {
                timestamp: 1,
                price: "150.01".parse().unwrap(),
                quantity: "10".parse().unwrap(),
                side: Side::Buy,
                mid: dec("150.005"),
            },
            TradePrint {
                timestamp: 2,
                price: "149.99".parse().unwrap(),
                quantity: "10".parse().unwrap(),
                side: Side::Sell,
                mid: dec("150.005"),
            },
        ];
        let result = effective_spread(&prints).unwrap();
        assert_eq!(result.mean_absolute, dec("0.010"));
        let expected = dec("0.010") / dec("150.005");
        assert!((result.relative - expected).abs() < dec("0.000000000001"));
        assert_eq!(result.trades, 2);
    }

    fn one_level_book(bid: (&str, &str), ask: (&str, &str)) -> OrderBook {
        let mut book = OrderBook::new(Symbol::new("BIG"));
        book.apply_snapshot(&MarketSnapshot {
            symbol: Symbol::new("BIG"),
            bids: vec![level(bid.0, bid.1, 0)],
            asks: vec![level(ask.0, ask.1, 0)],
            last_trade_price: Price::zero(),
            timestamp: 1,
        })
        .unwrap();
        book
    }

    #[test]
    fn test_large_book_metrics_stay_defined() {
        // Price × quantity exceeds the decimal range on both sides
        let book = one_level_book(
            ("1000000000000000", "100000000000000"),
            ("1000000000000001", "100000000000000"),
        );
        assert_eq!(micro_price(&book).unwrap(), dec("1000000000000000.5"));
        assert_eq!(mid_price(&book).unwrap(), dec("1000000000000000.5"));

        let metrics = InstantaneousMetrics::compute(&book, 5);
        assert_eq!(metrics.defined().len(), 5);
    }

    #[test]
    fn test_depth_overflow_is_undefined() {
        let huge = "50000000000000000000000000000";
        let book = one_level_book(("1", huge), ("2", huge));

        assert_eq!(visible_depth(&book, 5), None);
        assert_eq!(volume_imbalance(&book, 5), Decimal::ZERO);
        let metrics = InstantaneousMetrics::compute(&book, 5);
        assert!(metrics.defined().iter().all(|(m, _)| *m != Metric::Depth));
        assert_eq!(micro_price(&book).unwrap(), dec("1.5"));
    }

    #[test]
    fn test_midpoint_at_decimal_max() {
        assert_eq!(midpoint(Decimal::MAX, Decimal::MAX), Decimal::MAX);
        assert!(midpoint(Decimal::MAX - Decimal::ONE, Decimal::MAX) >= Decimal::MAX - Decimal::ONE);
    }

    #[test]
    fn test_mean_of_large_values() {
        let values = [Decimal::MAX - Decimal::ONE, Decimal::MAX - Decimal::ONE];
        let mean = mean_of(&values).unwrap();
        assert!((mean - (Decimal::MAX - Decimal::ONE)).abs() <= Decimal::ONE);
        assert_eq!(mean_of(&[]), None);
    }

    #[test]
    fn test_historical_volatility_overflow_is_reported() {
        let samples = [sample("0.0000000000000000000000000001"), sample("79228162514264"), sample("1")];
        assert_eq!(
            historical_volatility(&samples),
            Err(BookError::overflow("historical_volatility"))
        );
    }

    #[test]
    fn test_effective_spread_errors() {
        assert!(matches!(
            effective_spread(&[]),
            Err(BookError::InsufficientHistory { .. })
        ));

        let print = TradePrint {
            timestamp: 1,
            price: "79228162514264".parse().unwrap(),
            quantity: "1".parse().unwrap(),
            side: Side::Buy,
            mid: dec("0.0000000000000000000000000001"),
        };
        assert_eq!(effective_spread(&[print]), Err(BookError::overflow("effective_spread")));
    }
}
