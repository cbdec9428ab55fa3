//! Mean reversion strategy
//!
//! Trades against large deviations of the mid price from its rolling mean:
//! a z-score above the threshold sells into the bid, one below the negative
//! threshold buys from the ask. Size shrinks as the window gets noisier so a
//! one-sigma move never risks more than `risk_limit`.

use std::collections::BTreeMap;

use market_data::BookView;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::ids::Symbol;
use types::numeric::Quantity;
use types::order::{Order, Side};
use types::trade::Trade;

use super::{parse_param, require_positive, MarketTracker, OrderIds, Strategy, StrategyError, StrategyParams};

/// Configuration for the mean reversion strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanReversionConfig {
    /// Absolute z-score that triggers a trade
    pub deviation_threshold: Decimal,
    /// Number of mid samples in the rolling window
    pub lookback: usize,
    /// Maximum absolute net position the strategy will build
    pub max_position: Decimal,
    /// Loss budget for a one-sigma move against a new order
    pub risk_limit: Decimal,
    /// Size used when volatility does not constrain it
    pub base_size: Decimal,
    /// Floor on the spread the strategy assumes
    pub min_spread: Decimal,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            deviation_threshold: Decimal::from(2),
            lookback: 20,
            max_position: Decimal::from(1000),
            risk_limit: Decimal::from(1000),
            base_size: Decimal::from(100),
            min_spread: Decimal::new(1, 2),
        }
    }
}

impl MeanReversionConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        require_positive("deviation_threshold", self.deviation_threshold)?;
        require_positive("max_position", self.max_position)?;
        require_positive("risk_limit", self.risk_limit)?;
        require_positive("base_size", self.base_size)?;
        if self.lookback < 2 {
            return Err(StrategyError::InvalidParameter {
                key: "lookback".to_string(),
                value: self.lookback.to_string(),
                reason: "need at least two samples for a deviation".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MeanReversion {
    name: String,
    config: MeanReversionConfig,
    tracker: MarketTracker,
    positions: BTreeMap<Symbol, Decimal>,
    ids: OrderIds,
}

impl MeanReversion {
    pub fn new(name: impl Into<String>, config: MeanReversionConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        let name = name.into();
        Ok(Self {
            ids: OrderIds::new(&name),
            tracker: MarketTracker::new(config.lookback),
            name,
            config,
            positions: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &MeanReversionConfig {
        &self.config
    }

    pub fn position(&self, symbol: &Symbol) -> Decimal {
        self.positions.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    /// Current z-score of the mid against the window, once the window is full
    pub fn z_score(&self, symbol: &Symbol) -> Option<Decimal> {
        let state = self.tracker.state(symbol)?;
        if state.mids().len() < self.config.lookback {
            return None;
        }
        let mid = state.mid_price?;
        let std_dev = state.std_dev()?;
        if std_dev.is_zero() {
            return None;
        }
        mid.checked_sub(state.mean()?)?.checked_div(std_dev)
    }
}

impl Strategy for MeanReversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, params: &StrategyParams) -> Result<(), StrategyError> {
        let mut next = self.config.clone();
        for (key, value) in params {
            match key.as_str() {
                "deviation_threshold" => next.deviation_threshold = parse_param(key, value)?,
                "lookback" => next.lookback = parse_param(key, value)?,
                "max_position" => next.max_position = parse_param(key, value)?,
                "risk_limit" => next.risk_limit = parse_param(key, value)?,
                "base_size" => next.base_size = parse_param(key, value)?,
                "min_spread" => next.min_spread = parse_param(key, value)?,
                _ => return Err(StrategyError::UnknownParameter(key.clone())),
            }
        }
        next.validate()?;

        if next.lookback != self.config.lookback {
            self.tracker = MarketTracker::new(next.lookback);
        }
        self.config = next;
        Ok(())
    }

    fn on_market_data_update(&mut self, view: &BookView) -> Vec<Order> {
        self.tracker.observe(view);
        self.generate_order(view).into_iter().collect()
    }

    fn generate_order(&mut self, view: &BookView) -> Option<Order> {
        let z = self.z_score(&view.symbol)?;
        let threshold = self.config.deviation_threshold;

        let (side, price) = if z >= threshold {
            (Side::Sell, view.best_bid()?)
        } else if z <= -threshold {
            (Side::Buy, view.best_ask()?)
        } else {
            return None;
        };

        // Room left before the position limit in the direction of the trade
        let position = self.position(&view.symbol);
        let room = match side {
            Side::Buy => self.config.max_position.saturating_sub(position),
            Side::Sell => self.config.max_position.saturating_add(position),
        };
        let size = self.calculate_optimal_size(&view.symbol).min(room).floor();
        if size <= Decimal::ZERO {
            return None;
        }
        let quantity = Quantity::try_new(size)?;

        debug!(
            strategy = %self.name,
            symbol = %view.symbol,
            z_score = %z.round_dp(4),
            side = %side,
            %price,
            %quantity,
            "Deviation signal"
        );
        Some(Order::limit(
            self.ids.next(),
            view.symbol.clone(),
            side,
            price,
            quantity,
            view.timestamp,
        ))
    }

    fn calculate_optimal_size(&self, symbol: &Symbol) -> Decimal {
        let base = self.config.base_size.min(self.config.max_position);
        let std_dev = self
            .tracker
            .state(symbol)
            .and_then(|state| state.std_dev())
            .unwrap_or(Decimal::ZERO);
        if std_dev.is_zero() {
            return base;
        }
        // A tiny deviation can push the quotient out of range; base then binds
        self.config
            .risk_limit
            .checked_div(std_dev)
            .map_or(base, |budget| base.min(budget))
    }

    fn calculate_spread(&self, symbol: &Symbol) -> Decimal {
        self.tracker
            .state(symbol)
            .and_then(|state| state.spread)
            .map_or(self.config.min_spread, |spread| spread.max(self.config.min_spread))
    }

    fn on_fill(&mut self, trade: &Trade, signed_quantity: Decimal) {
        let position = self.positions.entry(trade.symbol.clone()).or_insert(Decimal::ZERO);
        *position = position.saturating_add(signed_quantity);
    }
}
