//! Trading session
//!
//! Wires the collaborators around one `OrderBookProcessor`:
//!
//! ```text
//!  flow / snapshots ──► InboundQueue (per symbol) ──► PositionLimitGate ──► processor
//!                              ▲                                               │
//!                              └──── strategy orders ◄── BookView ◄────────────┘
//! ```
//!
//! Only orders placed by strategies are risk checked and tracked as
//! positions; everything else is treated as external flow.

use std::collections::BTreeMap;

use market_data::{
    AnalyticsConfig, BookView, ConfigError, Inbound, InboundQueue, OrderBookProcessor, QueueConfig,
    QueueError,
};
use matching_engine::ExecutionReport;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::ids::{OrderId, Symbol};
use types::market::MarketSnapshot;
use types::order::{Order, OrderKind, Side};
use types::position::Position;
use types::risk::RiskGate;
use types::trade::Trade;

use crate::risk::PositionLimitGate;
use crate::strategy::{MarketMakerConfig, MeanReversionConfig, Strategy, StrategyConfig, StrategyError};

/// Errors raised while building or feeding a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// A named strategy instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySpec {
    pub name: String,
    pub config: StrategyConfig,
}

/// Configuration for a trading session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub analytics: AnalyticsConfig,
    pub queue: QueueConfig,
    /// Position limit per symbol for strategy orders
    pub max_position: Decimal,
    /// Levels per side in the views handed to strategies
    pub view_depth: usize,
    pub strategies: Vec<StrategySpec>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            analytics: AnalyticsConfig::default(),
            queue: QueueConfig::default(),
            max_position: Decimal::from(1000),
            view_depth: 5,
            strategies: vec![
                StrategySpec {
                    name: "mr".to_string(),
                    config: StrategyConfig::MeanReversion(MeanReversionConfig::default()),
                },
                StrategySpec {
                    name: "mm".to_string(),
                    config: StrategyConfig::MarketMaker(MarketMakerConfig::default()),
                },
            ],
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analytics.validate()?;
        self.queue.validate()?;
        if self.max_position <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "max_position",
                reason: "must be positive".to_string(),
            });
        }
        if self.view_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "view_depth",
                reason: "must be greater than zero".to_string(),
            });
        }

        let mut names: Vec<&str> = self.strategies.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        if names.iter().any(|name| name.is_empty()) || names.windows(2).any(|w| w[0] == w[1]) {
            return Err(ConfigError::Invalid {
                field: "strategies",
                reason: "strategy names must be non-empty and unique".to_string(),
            });
        }
        Ok(())
    }
}

/// Running counters for a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Operations the processor accepted
    pub applied: u64,
    /// Operations the processor rejected
    pub rejected: u64,
    /// Strategy orders stopped by the risk gate
    pub risk_rejected: u64,
    /// Strategy orders refused by a full queue
    pub refused: u64,
    pub strategy_orders: u64,
    pub trades: u64,
}

pub struct TradingSession {
    config: SessionConfig,
    processor: OrderBookProcessor,
    queues: BTreeMap<Symbol, InboundQueue>,
    risk: PositionLimitGate,
    strategies: Vec<Box<dyn Strategy>>,
    /// Live strategy orders: symbol and index of the strategy that placed them
    owners: BTreeMap<OrderId, (Symbol, usize)>,
    stats: SessionStats,
}

impl TradingSession {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let processor = OrderBookProcessor::new(config.analytics.clone())?;
        let strategies = config
            .strategies
            .iter()
            .map(|spec| spec.config.build(spec.name.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            strategies = strategies.len(),
            max_position = %config.max_position,
            "Trading session created"
        );
        Ok(Self {
            risk: PositionLimitGate::new(config.max_position),
            config,
            processor,
            queues: BTreeMap::new(),
            strategies,
            owners: BTreeMap::new(),
            stats: SessionStats::default(),
        })
    }

    /// Add a strategy built outside the config; its name must not clash
    pub fn add_strategy(&mut self, strategy: Box<dyn Strategy>) -> Result<(), SessionError> {
        if self.strategies.iter().any(|s| s.name() == strategy.name()) {
            return Err(ConfigError::Invalid {
                field: "strategies",
                reason: format!("duplicate strategy name {}", strategy.name()),
            }
            .into());
        }
        self.strategies.push(strategy);
        Ok(())
    }

    pub fn processor(&self) -> &OrderBookProcessor {
        &self.processor
    }

    /// Mutable access for queries that log, such as impact simulation
    pub fn processor_mut(&mut self) -> &mut OrderBookProcessor {
        &mut self.processor
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn position(&self, symbol: &Symbol) -> Position {
        self.risk.get_position(symbol)
    }

    pub fn risk_mut(&mut self) -> &mut PositionLimitGate {
        &mut self.risk
    }

    /// Operations waiting across all queues
    pub fn pending(&self) -> usize {
        self.queues.values().map(InboundQueue::len).sum()
    }

    pub fn view(&self, symbol: &Symbol) -> BookView {
        self.processor.book_view(symbol, self.config.view_depth)
    }

    /// Queue external flow for later processing
    pub fn submit(&mut self, inbound: Inbound) -> Result<(), SessionError> {
        self.queue_for(inbound.symbol().clone()).push(inbound)?;
        Ok(())
    }

    pub fn submit_order(&mut self, order: Order) -> Result<(), SessionError> {
        self.submit(Inbound::Order(order))
    }

    pub fn submit_market_data(&mut self, snapshot: MarketSnapshot) -> Result<(), SessionError> {
        self.submit(Inbound::MarketData(snapshot))
    }

    fn queue_for(&mut self, symbol: Symbol) -> &mut InboundQueue {
        let config = self.config.queue.clone();
        self.queues
            .entry(symbol.clone())
            .or_insert_with(|| InboundQueue::new(symbol, config))
    }

    /// Drain every queue, in symbol order, until nothing is pending
    ///
    /// Strategy orders produced along the way join the back of their
    /// symbol's queue and are processed in the same call.
    pub fn run(&mut self) -> &SessionStats {
        let symbols: Vec<Symbol> = self.queues.keys().cloned().collect();
        for symbol in symbols {
            while let Some(inbound) = self.queues.get_mut(&symbol).and_then(InboundQueue::pop) {
                self.step(inbound);
            }
        }
        &self.stats
    }

    fn step(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Order(order) => self.handle_order(order),
            Inbound::MarketData(snapshot) => self.handle_market_data(snapshot),
        }
    }

    fn handle_order(&mut self, order: Order) {
        if self.owners.contains_key(&order.order_id) {
            let position = self.risk.get_position(&order.symbol);
            let check = self.risk.validate_order(&order, &position);
            if !check.is_pass() {
                warn!(
                    order_id = %order.order_id,
                    symbol = %order.symbol,
                    check = ?check,
                    "Strategy order blocked by risk gate"
                );
                self.stats.risk_rejected += 1;
                self.owners.remove(&order.order_id);
                return;
            }
        }

        let kind = order.kind;
        let order_id = order.order_id.clone();
        match self.processor.process_order(order) {
            Ok(report) => {
                self.stats.applied += 1;
                self.stats.trades += report.trades.len() as u64;
                self.settle(&report);
                if kind == OrderKind::Cancel || !report.is_resting() {
                    self.owners.remove(&report.order_id);
                }
            }
            Err(e) => {
                debug!(order_id = %order_id, error = %e, "Order rejected");
                self.stats.rejected += 1;
                self.owners.remove(&order_id);
            }
        }
    }

    fn handle_market_data(&mut self, snapshot: MarketSnapshot) {
        let symbol = snapshot.symbol.clone();
        match self.processor.process_market_data_update(&snapshot) {
            Ok(applied) => {
                self.stats.applied += 1;
                if applied.displaced_orders > 0 {
                    debug!(symbol = %symbol, displaced = applied.displaced_orders, "Snapshot displaced resting orders");
                }
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Snapshot rejected");
                self.stats.rejected += 1;
                return;
            }
        }

        // The snapshot purged every resting order for the symbol
        let book = self.processor.book(&symbol);
        self.owners.retain(|id, (owned, _)| {
            owned != &symbol || book.map_or(false, |b| b.registry().contains(id))
        });

        let view = self.processor.book_view(&symbol, self.config.view_depth);
        for (index, strategy) in self.strategies.iter_mut().enumerate() {
            for order in strategy.on_market_data_update(&view) {
                self.stats.strategy_orders += 1;
                self.owners.insert(order.order_id.clone(), (symbol.clone(), index));
                let queue = self
                    .queues
                    .entry(symbol.clone())
                    .or_insert_with(|| InboundQueue::new(symbol.clone(), self.config.queue.clone()));
                if let Err(e) = queue.push(Inbound::Order(order.clone())) {
                    warn!(strategy = strategy.name(), error = %e, "Strategy order not queued");
                    self.stats.refused += 1;
                    self.owners.remove(&order.order_id);
                }
            }
        }
    }

    /// Attribute each fill to the strategy on either side of it
    fn settle(&mut self, report: &ExecutionReport) {
        for trade in &report.trades {
            if let Some(&(_, index)) = self.owners.get(&trade.taker_order_id) {
                self.credit(index, trade, trade.side);
            }
            if let Some(maker) = &trade.maker_order_id {
                if let Some(&(_, index)) = self.owners.get(maker) {
                    self.credit(index, trade, trade.side.opposite());
                }
            }
        }
    }

    fn credit(&mut self, index: usize, trade: &Trade, side: Side) {
        let signed = match side {
            Side::Buy => trade.quantity.as_decimal(),
            Side::Sell => -trade.quantity.as_decimal(),
        };
        let position = self.risk.apply_fill(&trade.symbol, signed);
        if let Some(strategy) = self.strategies.get_mut(index) {
            strategy.on_fill(trade, signed);
            debug!(
                strategy = strategy.name(),
                symbol = %trade.symbol,
                %signed,
                position = %position.quantity,
                "Strategy fill"
            );
        }
    }
}
