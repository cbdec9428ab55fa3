//! Seeded order flow
//!
//! Generates external market data snapshots (a random walk of the reference
//! mid) and a random mix of limit, market and cancel orders around it. Every
//! draw comes from one `ChaCha8Rng`, so a seed fully determines the stream.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{OrderId, Symbol};
use types::market::{MarketSnapshot, SnapshotLevel};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

use market_data::ConfigError;

/// Configuration for the order flow generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub seed: u64,
    /// Reference mid at start; rounded to the tick
    pub start_price: Decimal,
    pub tick: Decimal,
    /// Levels per side in generated snapshots
    pub depth_levels: u32,
    /// Largest mid move, in ticks, between two snapshots
    pub max_drift_ticks: u32,
    /// Largest distance of a limit order from the mid, in ticks
    pub max_distance_ticks: u32,
    /// Probability that an order is a market order
    pub market_ratio: f64,
    /// Probability that an order cancels an earlier limit
    pub cancel_ratio: f64,
    pub min_size: u64,
    pub max_size: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_price: Decimal::new(15_000, 2),
            tick: Decimal::new(1, 2),
            depth_levels: 5,
            max_drift_ticks: 3,
            max_distance_ticks: 5,
            market_ratio: 0.2,
            cancel_ratio: 0.1,
            min_size: 1,
            max_size: 100,
        }
    }
}

impl FlowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| ConfigError::Invalid {
            field,
            reason: reason.to_string(),
        };

        if self.tick <= Decimal::ZERO {
            return Err(invalid("tick", "must be positive"));
        }
        if self.start_price <= self.tick * Decimal::from(self.depth_levels + 1) {
            return Err(invalid("start_price", "too low for the configured depth"));
        }
        if self.depth_levels == 0 {
            return Err(invalid("depth_levels", "must be greater than zero"));
        }
        for (field, ratio) in [("market_ratio", self.market_ratio), ("cancel_ratio", self.cancel_ratio)] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(invalid(field, "must be between 0 and 1"));
            }
        }
        if self.market_ratio + self.cancel_ratio > 1.0 {
            return Err(invalid("cancel_ratio", "market_ratio + cancel_ratio exceeds 1"));
        }
        if self.min_size == 0 || self.min_size > self.max_size {
            return Err(invalid("min_size", "need 0 < min_size <= max_size"));
        }
        Ok(())
    }
}

/// Deterministic order and snapshot source for one symbol
#[derive(Debug, Clone)]
pub struct OrderFlowGenerator {
    symbol: Symbol,
    config: FlowConfig,
    rng: ChaCha8Rng,
    mid: Decimal,
    next_id: u64,
    /// Limit orders this generator placed that it may still cancel
    live: Vec<OrderId>,
}

impl OrderFlowGenerator {
    pub fn new(symbol: Symbol, config: FlowConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mid = (config.start_price / config.tick).round() * config.tick;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            symbol,
            config,
            mid,
            next_id: 1,
            live: Vec::new(),
        })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Current reference mid
    pub fn mid(&self) -> Decimal {
        self.mid
    }

    fn floor_price(&self) -> Decimal {
        self.config.tick * Decimal::from(self.config.depth_levels + 1)
    }

    fn ticks(&self, n: i64) -> Decimal {
        self.config.tick * Decimal::from(n)
    }

    fn price_at(&self, offset_ticks: i64) -> Price {
        let value = (self.mid + self.ticks(offset_ticks)).max(self.config.tick);
        Price::try_new(value).unwrap_or_else(Price::zero)
    }

    fn draw_size(&mut self) -> Quantity {
        Quantity::from_u64(self.rng.gen_range(self.config.min_size..=self.config.max_size))
    }

    fn next_order_id(&mut self) -> OrderId {
        let id = OrderId::new(format!("{}-flow-{}", self.symbol, self.next_id));
        self.next_id += 1;
        id
    }

    /// Move the mid and build a full snapshot around it
    ///
    /// Best bid and ask sit one tick either side of the mid.
    pub fn next_snapshot(&mut self, timestamp: u64) -> MarketSnapshot {
        let drift = self.config.max_drift_ticks as i64;
        let step = self.rng.gen_range(-drift..=drift);
        self.mid = (self.mid + self.ticks(step)).max(self.floor_price());

        let mut bids = Vec::with_capacity(self.config.depth_levels as usize);
        let mut asks = Vec::with_capacity(self.config.depth_levels as usize);
        for level in 0..self.config.depth_levels {
            let offset = level as i64 + 1;
            let bid_size = self.draw_size();
            let ask_size = self.draw_size();
            bids.push(SnapshotLevel::new(self.price_at(-offset), bid_size, level as u64));
            asks.push(SnapshotLevel::new(self.price_at(offset), ask_size, level as u64));
        }

        // The snapshot wipes every resting order, ours included
        self.live.clear();

        MarketSnapshot {
            symbol: self.symbol.clone(),
            bids,
            asks,
            last_trade_price: self.price_at(0),
            timestamp,
        }
    }

    /// Draw the next order; cancels only target this generator's own limits
    pub fn next_order(&mut self, timestamp: u64) -> Order {
        let roll: f64 = self.rng.gen();
        let side = if self.rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };

        if roll < self.config.cancel_ratio {
            // Nothing to cancel yet falls through to a limit
            if !self.live.is_empty() {
                let index = self.rng.gen_range(0..self.live.len());
                let target = self.live.swap_remove(index);
                return Order::cancel(target, self.symbol.clone(), timestamp);
            }
        } else if roll < self.config.cancel_ratio + self.config.market_ratio {
            let quantity = self.draw_size();
            let id = self.next_order_id();
            return Order::market(id, self.symbol.clone(), side, quantity, timestamp);
        }

        let quantity = self.draw_size();
        let id = self.next_order_id();

        // Zero distance lets the flow cross itself at the mid
        let distance = self.rng.gen_range(0..=self.config.max_distance_ticks) as i64;
        let price = match side {
            Side::Buy => self.price_at(-distance),
            Side::Sell => self.price_at(distance),
        };
        self.live.push(id.clone());
        Order::limit(id, self.symbol.clone(), side, price, quantity, timestamp)
    }
}
