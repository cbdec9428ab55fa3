//! Simulation harness for the order book engine
//!
//! Plays the collaborator roles the engine consumes but does not own:
//! trading strategies, a position-limit risk gate and seeded external order
//! flow, wired together by a trading session around one processor.
//!
//! # Modules
//! - `strategy`: Strategy capability trait, mean reversion and market making
//! - `risk`: Position-limit implementation of `RiskGate`
//! - `flow`: Seeded order and snapshot generator
//! - `session`: Queue → risk gate → processor → position wiring

pub mod flow;
pub mod risk;
pub mod session;
pub mod strategy;

pub use flow::{FlowConfig, OrderFlowGenerator};
pub use risk::PositionLimitGate;
pub use session::{SessionConfig, SessionError, SessionStats, StrategySpec, TradingSession};
pub use strategy::{Strategy, StrategyConfig, StrategyError, StrategyParams};

/// Crate version constant
pub const VERSION: &str = "1.0.0";
