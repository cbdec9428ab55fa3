//! Trading strategies
//!
//! A strategy watches owned `BookView`s and proposes orders. It never touches
//! a book: the session pushes every proposal through the risk gate and the
//! symbol's inbound queue before the engine sees it.
//!
//! Variants are picked by a tagged `StrategyConfig`, so a session can be
//! described entirely in JSON.

pub mod market_maker;
pub mod mean_reversion;

use std::collections::{BTreeMap, VecDeque};

use market_data::BookView;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use types::ids::{OrderId, Symbol};
use types::order::Order;
use types::trade::Trade;

pub use market_maker::{MarketMaker, MarketMakerConfig};
pub use mean_reversion::{MeanReversion, MeanReversionConfig};

/// Free-form `key → value` parameters accepted by `Strategy::initialize`
pub type StrategyParams = BTreeMap<String, String>;

/// Errors raised while configuring a strategy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error("unknown strategy parameter {0}")]
    UnknownParameter(String),

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidParameter {
        key: String,
        value: String,
        reason: String,
    },

    #[error("failed to parse strategy config: {0}")]
    Parse(String),
}

impl StrategyError {
    fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Capability interface every strategy variant implements
pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Override parameters by name; unknown keys are rejected and nothing changes on error
    fn initialize(&mut self, params: &StrategyParams) -> Result<(), StrategyError>;

    /// Record the view and return every order the strategy wants placed
    fn on_market_data_update(&mut self, view: &BookView) -> Vec<Order>;

    /// Single best order for the current view, using state recorded so far
    fn generate_order(&mut self, view: &BookView) -> Option<Order>;

    /// Order size the strategy would use for `symbol` right now
    fn calculate_optimal_size(&self, symbol: &Symbol) -> Decimal;

    /// Spread the strategy assumes for `symbol`
    fn calculate_spread(&self, symbol: &Symbol) -> Decimal;

    /// A fill on one of this strategy's orders; `signed_quantity` is + for bought, - for sold
    fn on_fill(&mut self, _trade: &Trade, _signed_quantity: Decimal) {}
}

/// Selects and configures a strategy variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    MeanReversion(MeanReversionConfig),
    MarketMaker(MarketMakerConfig),
}

impl StrategyConfig {
    pub fn from_json(json: &str) -> Result<Self, StrategyError> {
        serde_json::from_str(json).map_err(|e| StrategyError::Parse(e.to_string()))
    }

    /// Validate and instantiate the configured variant
    pub fn build(&self, name: impl Into<String>) -> Result<Box<dyn Strategy>, StrategyError> {
        let name = name.into();
        match self {
            StrategyConfig::MeanReversion(config) => {
                Ok(Box::new(MeanReversion::new(name, config.clone())?))
            }
            StrategyConfig::MarketMaker(config) => {
                Ok(Box::new(MarketMaker::new(name, config.clone())?))
            }
        }
    }
}

/// Per-symbol market state a strategy keeps between updates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketState {
    pub mid_price: Option<Decimal>,
    pub spread: Option<Decimal>,
    /// Total visible quantity across both sides of the last view
    pub volume: Decimal,
    pub last_update: u64,
    mids: VecDeque<Decimal>,
}

impl MarketState {
    /// Mid prices seen so far, oldest first
    pub fn mids(&self) -> &VecDeque<Decimal> {
        &self.mids
    }

    /// Mean of the window; None when empty or out of decimal range
    pub fn mean(&self) -> Option<Decimal> {
        if self.mids.is_empty() {
            return None;
        }
        let n = Decimal::from(self.mids.len());
        match self.mids.iter().try_fold(Decimal::ZERO, |acc, mid| acc.checked_add(*mid)) {
            Some(sum) => Some(sum / n),
            None => self
                .mids
                .iter()
                .try_fold(Decimal::ZERO, |acc, mid| acc.checked_add(*mid / n)),
        }
    }

    /// Population standard deviation of the mid window
    pub fn std_dev(&self) -> Option<Decimal> {
        let mean = self.mean()?;
        let squares = self.mids.iter().try_fold(Decimal::ZERO, |acc, mid| {
            let deviation = mid.checked_sub(mean)?;
            acc.checked_add(deviation.checked_mul(deviation)?)
        })?;
        (squares / Decimal::from(self.mids.len())).sqrt()
    }
}

/// Rolling per-symbol market state with a fixed mid window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketTracker {
    window: usize,
    states: BTreeMap<Symbol, MarketState>,
}

impl MarketTracker {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            states: BTreeMap::new(),
        }
    }

    /// Fold a view into the symbol's state; views without a mid keep the window unchanged
    pub fn observe(&mut self, view: &BookView) -> &MarketState {
        let state = self.states.entry(view.symbol.clone()).or_default();
        state.mid_price = view.mid_price();
        state.spread = view.spread();
        state.volume = view
            .bids
            .iter()
            .chain(view.asks.iter())
            .fold(Decimal::ZERO, |acc, level| acc.saturating_add(level.quantity.as_decimal()));
        state.last_update = view.timestamp;

        if let Some(mid) = state.mid_price {
            state.mids.push_back(mid);
            while state.mids.len() > self.window {
                state.mids.pop_front();
            }
        }
        state
    }

    pub fn state(&self, symbol: &Symbol) -> Option<&MarketState> {
        self.states.get(symbol)
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

/// `<prefix>-<n>` order ids, unique per strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OrderIds {
    prefix: String,
    next: u64,
}

impl OrderIds {
    pub(crate) fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: 1,
        }
    }

    pub(crate) fn next(&mut self) -> OrderId {
        let id = OrderId::new(format!("{}-{}", self.prefix, self.next));
        self.next += 1;
        id
    }
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, StrategyError> {
    value
        .parse()
        .map_err(|_| StrategyError::invalid(key, value, "not a valid number"))
}

fn require_positive(key: &str, value: Decimal) -> Result<(), StrategyError> {
    if value <= Decimal::ZERO {
        return Err(StrategyError::invalid(key, &value.to_string(), "must be positive"));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::{dec, view};
    use super::*;

    #[test]
    fn test_tracker_keeps_bounded_window() {
        let mut tracker = MarketTracker::new(3);
        for (i, bid) in ["100.00", "101.00", "102.00", "103.00"].iter().enumerate() {
            let ask = (dec(bid) + dec("0.02")).to_string();
            tracker.observe(&view(bid, &ask, i as u64));
        }

        let state = tracker.state(&Symbol::new("AAPL")).unwrap();
        let mids: Vec<Decimal> = state.mids().iter().copied().collect();
        assert_eq!(mids, vec![dec("101.01"), dec("102.01"), dec("103.01")]);
        assert_eq!(state.mean(), Some(dec("102.01")));
        assert_eq!(state.spread, Some(dec("0.02")));
        assert_eq!(state.volume, Decimal::from(200));
        assert_eq!(state.last_update, 3);
    }

    #[test]
    fn test_flat_window_has_zero_std_dev() {
        let mut tracker = MarketTracker::new(5);
        for ts in 0..5 {
            tracker.observe(&view("10.00", "10.02", ts));
        }
        let state = tracker.state(&Symbol::new("AAPL")).unwrap();
        assert_eq!(state.std_dev(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_window_statistics_at_decimal_range() {
        let state = MarketState {
            mids: VecDeque::from(vec![Decimal::MAX - Decimal::ONE, Decimal::MAX - Decimal::ONE]),
            ..MarketState::default()
        };
        assert_eq!(state.mean(), Some(Decimal::MAX - Decimal::ONE));
        assert_eq!(state.std_dev(), Some(Decimal::ZERO));

        let spread_out = MarketState {
            mids: VecDeque::from(vec![Decimal::ZERO, Decimal::MAX]),
            ..MarketState::default()
        };
        assert_eq!(spread_out.std_dev(), None);
    }

    #[test]
    fn test_config_json_selects_variant() {
        let config = StrategyConfig::from_json(
            r#"{"kind": "mean_reversion", "deviation_threshold": "1.5", "lookback": 10}"#,
        )
        .unwrap();
        match &config {
            StrategyConfig::MeanReversion(mr) => {
                assert_eq!(mr.deviation_threshold, dec("1.5"));
                assert_eq!(mr.lookback, 10);
                assert_eq!(mr.max_position, Decimal::from(1000));
            }
            other => panic!("unexpected variant {:?}", other),
        }

        let strategy = config.build("mr").unwrap();
        assert_eq!(strategy.name(), "mr");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = StrategyConfig::from_json(r#"{"kind": "momentum"}"#);
        assert!(matches!(result, Err(StrategyError::Parse(_))));
    }

    #[test]
    fn test_order_ids_are_prefixed_and_sequential() {
        let mut ids = OrderIds::new("mm");
        assert_eq!(ids.next().as_str(), "mm-1");
        assert_eq!(ids.next().as_str(), "mm-2");
    }
}
