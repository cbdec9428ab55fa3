//! Rolling per-symbol history
//!
//! Every series is a bounded ring buffer: appends evict the oldest entry once
//! capacity is reached, and entries older than the retention window (measured
//! from the newest timestamp) are dropped on append. Insertion order is time
//! order because timestamps never regress within a symbol.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::errors::BookError;
use types::ids::Symbol;
use types::numeric::{Price, Quantity};
use types::order::Side;

use crate::config::AnalyticsConfig;

/// Anything stored in a rolling series
pub trait Timestamped {
    fn timestamp(&self) -> u64;
}

/// Instantaneous metrics recorded after each mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Spread,
    MidPrice,
    MicroPrice,
    VolumeImbalance,
    /// Total quantity over the configured top levels of both sides
    Depth,
    LastTradePrice,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Spread,
        Metric::MidPrice,
        Metric::MicroPrice,
        Metric::VolumeImbalance,
        Metric::Depth,
        Metric::LastTradePrice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Spread => "spread",
            Metric::MidPrice => "mid_price",
            Metric::MicroPrice => "micro_price",
            Metric::VolumeImbalance => "volume_imbalance",
            Metric::Depth => "depth",
            Metric::LastTradePrice => "last_trade_price",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: u64,
    pub value: Decimal,
}

impl Timestamped for MetricSample {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Audit entry for one market impact simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactRecord {
    pub timestamp: u64,
    pub quantity: Quantity,
    pub side: Side,
    /// Fillable quantity over requested quantity, in [0, 1]
    pub fill_ratio: Decimal,
    /// VWAP minus mid; None when nothing was fillable or mid was undefined
    pub price_impact: Option<Decimal>,
}

impl Timestamped for ImpactRecord {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// An internally matched trade with the mid that prevailed before it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePrint {
    pub timestamp: u64,
    pub price: Price,
    pub quantity: Quantity,
    /// Aggressor side
    pub side: Side,
    pub mid: Decimal,
}

impl Timestamped for TradePrint {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Bounded ring buffer with optional time-window retention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingSeries<T> {
    items: VecDeque<T>,
    capacity: usize,
    retention_ns: Option<u64>,
}

impl<T: Timestamped> RollingSeries<T> {
    pub fn new(capacity: usize, retention_ns: Option<u64>) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            retention_ns,
        }
    }

    pub fn push(&mut self, item: T) {
        if let Some(retention) = self.retention_ns {
            let cutoff = item.timestamp().saturating_sub(retention);
            while self.items.front().is_some_and(|oldest| oldest.timestamp() < cutoff) {
                self.items.pop_front();
            }
        }
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// The most recent `count` entries, oldest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &T> {
        self.items.iter().skip(self.items.len().saturating_sub(count))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// All history kept for one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolHistory {
    metrics: BTreeMap<Metric, RollingSeries<MetricSample>>,
    impacts: RollingSeries<ImpactRecord>,
    trades: RollingSeries<TradePrint>,
}

impl SymbolHistory {
    fn new(config: &AnalyticsConfig) -> Self {
        let metrics = Metric::ALL
            .iter()
            .map(|metric| (*metric, RollingSeries::new(config.history_capacity, config.retention_ns)))
            .collect();
        Self {
            metrics,
            impacts: RollingSeries::new(config.impact_capacity, config.retention_ns),
            trades: RollingSeries::new(config.trade_capacity, config.retention_ns),
        }
    }

    pub fn metric(&self, metric: Metric) -> Option<&RollingSeries<MetricSample>> {
        self.metrics.get(&metric)
    }

    pub fn impacts(&self) -> &RollingSeries<ImpactRecord> {
        &self.impacts
    }

    pub fn trades(&self) -> &RollingSeries<TradePrint> {
        &self.trades
    }
}

/// History for every symbol the processor has seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStore {
    config: AnalyticsConfig,
    symbols: BTreeMap<Symbol, SymbolHistory>,
}

impl HistoryStore {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            config,
            symbols: BTreeMap::new(),
        }
    }

    fn entry(&mut self, symbol: &Symbol) -> &mut SymbolHistory {
        let config = &self.config;
        self.symbols
            .entry(symbol.clone())
            .or_insert_with(|| SymbolHistory::new(config))
    }

    pub fn record_metric(&mut self, symbol: &Symbol, metric: Metric, sample: MetricSample) {
        let history = self.entry(symbol);
        if let Some(series) = history.metrics.get_mut(&metric) {
            series.push(sample);
        }
    }

    pub fn record_impact(&mut self, symbol: &Symbol, record: ImpactRecord) {
        self.entry(symbol).impacts.push(record);
    }

    pub fn record_trade(&mut self, symbol: &Symbol, print: TradePrint) {
        self.entry(symbol).trades.push(print);
    }

    pub fn symbol(&self, symbol: &Symbol) -> Option<&SymbolHistory> {
        self.symbols.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = (&Symbol, &SymbolHistory)> {
        self.symbols.iter()
    }

    /// Most recent `lookback` samples of a metric, oldest first
    pub fn metric_samples(
        &self,
        symbol: &Symbol,
        metric: Metric,
        lookback: usize,
    ) -> Result<Vec<MetricSample>, BookError> {
        let series = self.symbol(symbol).and_then(|h| h.metric(metric));
        let available = series.map_or(0, RollingSeries::len);
        if lookback == 0 || lookback > available {
            return Err(BookError::insufficient_history(metric.as_str(), lookback, available));
        }
        Ok(series.map(|s| s.recent(lookback).copied().collect()).unwrap_or_default())
    }

    /// Most recent `lookback` impact records, oldest first
    pub fn impact_records(&self, symbol: &Symbol, lookback: usize) -> Result<Vec<ImpactRecord>, BookError> {
        let series = self.symbol(symbol).map(SymbolHistory::impacts);
        let available = series.map_or(0, RollingSeries::len);
        if lookback == 0 || lookback > available {
            return Err(BookError::insufficient_history("impact_records", lookback, available));
        }
        Ok(series.map(|s| s.recent(lookback).cloned().collect()).unwrap_or_default())
    }

    /// Most recent `lookback` trade prints, oldest first
    pub fn trade_prints(&self, symbol: &Symbol, lookback: usize) -> Result<Vec<TradePrint>, BookError> {
        let series = self.symbol(symbol).map(SymbolHistory::trades);
        let available = series.map_or(0, RollingSeries::len);
        if lookback == 0 || lookback > available {
            return Err(BookError::insufficient_history("trade_prints", lookback, available));
        }
        Ok(series.map(|s| s.recent(lookback).cloned().collect()).unwrap_or_default())
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: u64, value: i64) -> MetricSample {
        MetricSample {
            timestamp,
            value: Decimal::from(value),
        }
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let mut series = RollingSeries::new(3, None);
        for i in 1..=5 {
            series.push(sample(i, i as i64));
        }

        let values: Vec<Decimal> = series.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![Decimal::from(3), Decimal::from(4), Decimal::from(5)]);
    }

    #[test]
    fn test_retention_window() {
        let mut series = RollingSeries::new(100, Some(10));
        series.push(sample(0, 1));
        series.push(sample(5, 2));
        series.push(sample(15, 3));

        // 0 is older than 15 - 10, 5 is exactly on the boundary
        assert_eq!(series.len(), 2);
        assert_eq!(series.iter().next().map(|s| s.timestamp), Some(5));
    }

    #[test]
    fn test_recent_returns_oldest_first() {
        let mut series = RollingSeries::new(10, None);
        for i in 1..=4 {
            series.push(sample(i, i as i64));
        }
        let recent: Vec<u64> = series.recent(2).map(|s| s.timestamp).collect();
        assert_eq!(recent, vec![3, 4]);
        assert_eq!(series.recent(10).count(), 4);
    }

    #[test]
    fn test_metric_samples_insufficient_history() {
        let mut store = HistoryStore::new(AnalyticsConfig::default());
        let symbol = Symbol::new("AAPL");
        store.record_metric(&symbol, Metric::Spread, sample(1, 1));

        assert_eq!(store.metric_samples(&symbol, Metric::Spread, 1).unwrap().len(), 1);
        assert_eq!(
            store.metric_samples(&symbol, Metric::Spread, 2),
            Err(BookError::InsufficientHistory {
                metric: "spread".to_string(),
                requested: 2,
                available: 1,
            })
        );
        assert!(store.metric_samples(&Symbol::new("MSFT"), Metric::Spread, 1).is_err());
    }

    #[test]
    fn test_clear() {
        let mut store = HistoryStore::new(AnalyticsConfig::default());
        store.record_metric(&Symbol::new("AAPL"), Metric::MidPrice, sample(1, 1));
        store.clear();
        assert!(store.symbol(&Symbol::new("AAPL")).is_none());
    }
}
