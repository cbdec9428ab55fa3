//! Order book processor
//!
//! Owns the matching engine and the rolling history for a set of symbols and
//! exposes every query the analytics layer supports. After each successful
//! mutation the affected symbol's instantaneous metrics are recomputed and
//! one sample per defined metric is appended to history.
//!
//! The processor is single-writer: mutating calls for a symbol must be
//! delivered sequentially. Read-only queries take `&self` and may run
//! concurrently with each other.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, info};
use types::errors::BookError;
use types::ids::Symbol;
use types::market::MarketSnapshot;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

use matching_engine::{ExecutionReport, MatchingEngine, OrderBook, SnapshotApplied};

use crate::config::{AnalyticsConfig, ConfigError};
use crate::history::{HistoryStore, Metric, MetricSample, TradePrint};
use crate::impact::{self, MarketImpact};
use crate::metrics::{self, EffectiveSpread, InstantaneousMetrics};
use crate::snapshot::{self, BookView};
use crate::toxicity::ToxicityReport;

/// Engine plus analytics for one shard of symbols
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookProcessor {
    config: AnalyticsConfig,
    engine: MatchingEngine,
    history: HistoryStore,
}

impl OrderBookProcessor {
    /// Create a processor after validating its configuration.
    pub fn new(config: AnalyticsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            history_capacity = config.history_capacity,
            imbalance_depth = config.imbalance_depth,
            retention_ns = ?config.retention_ns,
            "OrderBookProcessor initialized"
        );
        Ok(Self {
            history: HistoryStore::new(config.clone()),
            engine: MatchingEngine::new(),
            config,
        })
    }

    /// Create a processor with default configuration.
    pub fn with_defaults() -> Self {
        let config = AnalyticsConfig::default();
        Self {
            history: HistoryStore::new(config.clone()),
            engine: MatchingEngine::new(),
            config,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn book(&self, symbol: &Symbol) -> Option<&OrderBook> {
        self.engine.book(symbol)
    }

    /// Match an order and record the resulting metrics and trade prints
    pub fn process_order(&mut self, order: Order) -> Result<ExecutionReport, BookError> {
        let symbol = order.symbol.clone();
        let mid_before = self.book(&symbol).and_then(|b| metrics::mid_price(b).ok());

        let report = self.engine.process_order(order)?;

        if let Some(mid) = mid_before {
            for trade in &report.trades {
                self.history.record_trade(
                    &symbol,
                    TradePrint {
                        timestamp: trade.executed_at,
                        price: trade.price,
                        quantity: trade.quantity,
                        side: trade.side,
                        mid,
                    },
                );
            }
        }
        self.record_metrics(&symbol);
        Ok(report)
    }

    /// Replace a symbol's ladders from an external snapshot
    pub fn process_market_data_update(
        &mut self,
        snapshot: &MarketSnapshot,
    ) -> Result<SnapshotApplied, BookError> {
        let applied = self.engine.process_market_data_update(snapshot)?;
        self.record_metrics(&snapshot.symbol);
        Ok(applied)
    }

    fn record_metrics(&mut self, symbol: &Symbol) {
        let Some(book) = self.engine.book(symbol) else {
            return;
        };
        let timestamp = book.last_update();
        let computed = InstantaneousMetrics::compute(book, self.config.imbalance_depth);
        for (metric, value) in computed.defined() {
            self.history
                .record_metric(symbol, metric, MetricSample { timestamp, value });
        }
        debug!(
            %symbol,
            timestamp,
            spread = ?computed.spread,
            mid = ?computed.mid_price,
            "Metrics recorded"
        );
    }

    fn require_book(&self, symbol: &Symbol, side: Side) -> Result<&OrderBook, BookError> {
        self.book(symbol).ok_or_else(|| BookError::InsufficientLiquidity {
            symbol: symbol.clone(),
            side: side.as_str(),
        })
    }

    pub fn spread(&self, symbol: &Symbol) -> Result<Decimal, BookError> {
        metrics::spread(self.require_book(symbol, Side::Buy)?)
    }

    pub fn mid_price(&self, symbol: &Symbol) -> Result<Decimal, BookError> {
        metrics::mid_price(self.require_book(symbol, Side::Buy)?)
    }

    pub fn micro_price(&self, symbol: &Symbol) -> Result<Decimal, BookError> {
        metrics::micro_price(self.require_book(symbol, Side::Buy)?)
    }

    /// Imbalance over the configured depth; 0 for an unknown symbol
    pub fn volume_imbalance(&self, symbol: &Symbol) -> Decimal {
        self.book(symbol)
            .map(|b| metrics::volume_imbalance(b, self.config.imbalance_depth))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn last_trade_price(&self, symbol: &Symbol) -> Option<Price> {
        self.book(symbol).and_then(OrderBook::last_trade_price)
    }

    /// Mean of the most recent `lookback` spread samples
    pub fn average_spread(&self, symbol: &Symbol, lookback: usize) -> Result<Decimal, BookError> {
        let samples = self.history.metric_samples(symbol, Metric::Spread, lookback)?;
        metrics::mean(&samples).ok_or_else(|| BookError::overflow("average_spread"))
    }

    /// Sample standard deviation of mid-price returns over `lookback` samples
    pub fn historical_vol(&self, symbol: &Symbol, lookback: usize) -> Result<Decimal, BookError> {
        let samples = self.history.metric_samples(symbol, Metric::MidPrice, lookback)?;
        metrics::historical_volatility(&samples)
    }

    /// Simulate sweeping `quantity` against the current book and log an impact record
    pub fn calculate_market_impact(
        &mut self,
        symbol: &Symbol,
        quantity: Quantity,
        side: Side,
    ) -> Result<MarketImpact, BookError> {
        if quantity.is_zero() {
            return Err(BookError::invalid_order("impact quantity must be positive"));
        }
        let book = self.engine.book(symbol);
        let result = impact::simulate(book, quantity, side);
        let timestamp = book.map_or(0, OrderBook::last_update);

        self.history.record_impact(symbol, result.to_record(timestamp));
        debug!(
            %symbol,
            %side,
            %quantity,
            fill_ratio = %result.fill_ratio,
            "Impact simulated"
        );
        Ok(result)
    }

    /// Toxicity sub-metrics over the most recent `lookback` impact records
    pub fn analyze_order_flow_toxicity(
        &self,
        symbol: &Symbol,
        lookback: usize,
    ) -> Result<ToxicityReport, BookError> {
        let records = self.history.impact_records(symbol, lookback)?;
        Ok(ToxicityReport::from_records(&records))
    }

    /// Effective spread of the most recent `lookback` matched trades
    pub fn calculate_effective_spread(
        &self,
        symbol: &Symbol,
        lookback: usize,
    ) -> Result<EffectiveSpread, BookError> {
        let prints = self.history.trade_prints(symbol, lookback)?;
        metrics::effective_spread(&prints)
    }

    /// Human-readable depth report
    pub fn get_order_book_snapshot(&self, symbol: &Symbol, depth: usize) -> String {
        snapshot::render_report(symbol, self.book(symbol), depth)
    }

    /// Owned depth copy for collaborators
    pub fn book_view(&self, symbol: &Symbol, depth: usize) -> BookView {
        self.book(symbol)
            .map(|b| BookView::from_book(b, depth))
            .unwrap_or_else(|| BookView::empty(symbol.clone()))
    }

    /// Raw samples of a recorded metric, oldest first
    pub fn metric_history(
        &self,
        symbol: &Symbol,
        metric: Metric,
        lookback: usize,
    ) -> Result<Vec<MetricSample>, BookError> {
        self.history.metric_samples(symbol, metric, lookback)
    }

    /// Latest value of every recorded metric for a symbol
    pub fn latest_metrics(&self, symbol: &Symbol) -> BTreeMap<Metric, Decimal> {
        let Some(history) = self.history.symbol(symbol) else {
            return BTreeMap::new();
        };
        Metric::ALL
            .iter()
            .filter_map(|metric| {
                let latest = history.metric(*metric)?.latest()?;
                Some((*metric, latest.value))
            })
            .collect()
    }

    /// SHA-256 digest of ladders and history
    pub fn state_checksum(&self) -> String {
        snapshot::state_checksum(&self.engine, &self.history)
    }

    /// Clear every ladder, registry and history series
    pub fn reset_metrics(&mut self) {
        let symbols = self.engine.symbols().count();
        self.engine.reset();
        self.history.clear();
        info!(symbols, "Processor reset");
    }
}
