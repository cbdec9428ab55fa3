//! Order flow toxicity over simulated impact records
//!
//! A VPIN-style signal: low fill ratios combined with one-sided flow suggest
//! informed flow that is eating through visible depth.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::order::Side;

use crate::history::ImpactRecord;
use crate::metrics::{checked_sum, mean_of, normalized_difference};

/// Sum of `value / n`; bounded by the largest value when n >= len
fn scaled_sum(values: &[Decimal], n: Decimal) -> Decimal {
    values.iter().fold(Decimal::ZERO, |acc, value| acc.saturating_add(*value / n))
}

/// Named sub-metrics aggregated over recent impact records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToxicityReport {
    pub samples: usize,
    pub mean_fill_ratio: Decimal,
    /// Share of records that were buys, by count
    pub buy_fraction: Decimal,
    /// (buy qty - sell qty) / (buy qty + sell qty) over requested quantities
    pub directional_imbalance: Decimal,
    /// Mean impact over records where it was defined
    pub mean_price_impact: Option<Decimal>,
    /// (1 - mean fill ratio) * |directional imbalance|, in [0, 1]
    pub toxicity_score: Decimal,
}

impl ToxicityReport {
    /// Aggregate the given records; callers pass a non-empty window
    pub fn from_records(records: &[ImpactRecord]) -> Self {
        let samples = records.len();
        if samples == 0 {
            return Self {
                samples,
                mean_fill_ratio: Decimal::ZERO,
                buy_fraction: Decimal::ZERO,
                directional_imbalance: Decimal::ZERO,
                mean_price_impact: None,
                toxicity_score: Decimal::ZERO,
            };
        }
        let count = Decimal::from(samples);

        let fill_ratios: Vec<Decimal> = records.iter().map(|r| r.fill_ratio).collect();
        let quantities = |side: Side| -> Vec<Decimal> {
            records
                .iter()
                .filter(|r| r.side == side)
                .map(|r| r.quantity.as_decimal())
                .collect()
        };
        let buy_qty = quantities(Side::Buy);
        let sell_qty = quantities(Side::Sell);
        let impacts: Vec<Decimal> = records.iter().filter_map(|r| r.price_impact).collect();

        // Scaling both sides by the window size leaves the ratio unchanged
        let totals = (
            checked_sum(buy_qty.iter().copied()),
            checked_sum(sell_qty.iter().copied()),
        );
        let directional_imbalance = match totals {
            (Some(buys), Some(sells)) => normalized_difference(buys, sells),
            _ => normalized_difference(scaled_sum(&buy_qty, count), scaled_sum(&sell_qty, count)),
        };

        // Fill ratios lie in [0, 1]
        let mean_fill_ratio = mean_of(&fill_ratios).unwrap_or(Decimal::ZERO);

        Self {
            samples,
            mean_fill_ratio,
            buy_fraction: Decimal::from(buy_qty.len()) / count,
            directional_imbalance,
            mean_price_impact: mean_of(&impacts),
            toxicity_score: (Decimal::ONE - mean_fill_ratio) * directional_imbalance.abs(),
        }
    }

    /// Sub-metrics by name; an undefined mean impact is omitted
    pub fn to_map(&self) -> BTreeMap<&'static str, Decimal> {
        let mut map = BTreeMap::new();
        map.insert("samples", Decimal::from(self.samples));
        map.insert("mean_fill_ratio", self.mean_fill_ratio);
        map.insert("buy_fraction", self.buy_fraction);
        map.insert("directional_imbalance", self.directional_imbalance);
        if let Some(impact) = self.mean_price_impact {
            map.insert("mean_price_impact", impact);
        }
        map.insert("toxicity_score", self.toxicity_score);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(side: Side, qty: u64, fill_ratio: &str, impact: Option<&str>) -> ImpactRecord {
        ImpactRecord {
            timestamp: 0,
            quantity: types::numeric::Quantity::from_u64(qty),
            side,
            fill_ratio: Decimal::from_str_exact(fill_ratio).unwrap(),
            price_impact: impact.map(|s| Decimal::from_str_exact(s).unwrap()),
        }
    }

    #[test]
    fn test_balanced_full_fills_are_benign() {
        let records = vec![
            record(Side::Buy, 100, "1", Some("0.01")),
            record(Side::Sell, 100, "1", Some("-0.01")),
        ];
        let report = ToxicityReport::from_records(&records);

        assert_eq!(report.directional_imbalance, Decimal::ZERO);
        assert_eq!(report.toxicity_score, Decimal::ZERO);
        assert_eq!(report.mean_price_impact, Some(Decimal::ZERO));
        assert_eq!(report.buy_fraction, Decimal::from_str_exact("0.5").unwrap());
    }

    #[test]
    fn test_one_sided_partial_fills_are_toxic() {
        let records = vec![
            record(Side::Buy, 500, "0.5", Some("0.02")),
            record(Side::Buy, 500, "0.5", None),
        ];
        let report = ToxicityReport::from_records(&records);

        assert_eq!(report.directional_imbalance, Decimal::ONE);
        assert_eq!(report.toxicity_score, Decimal::from_str_exact("0.5").unwrap());
        assert_eq!(report.mean_price_impact, Some(Decimal::from_str_exact("0.02").unwrap()));
    }

    #[test]
    fn test_map_names() {
        let report = ToxicityReport::from_records(&[record(Side::Sell, 10, "0", None)]);
        let map = report.to_map();

        assert_eq!(map["directional_imbalance"], Decimal::NEGATIVE_ONE);
        assert_eq!(map["toxicity_score"], Decimal::ONE);
        assert!(!map.contains_key("mean_price_impact"));
    }

    #[test]
    fn test_huge_requests_do_not_overflow() {
        let huge = ImpactRecord {
            quantity: "50000000000000000000000000000".parse().unwrap(),
            ..record(Side::Buy, 1, "0", None)
        };
        let records = vec![huge.clone(), huge, record(Side::Sell, 0, "0", None)];
        let report = ToxicityReport::from_records(&records);

        assert_eq!(report.samples, 3);
        assert_eq!(report.directional_imbalance, Decimal::ONE);
        assert_eq!(report.toxicity_score, Decimal::ONE);
    }
}
