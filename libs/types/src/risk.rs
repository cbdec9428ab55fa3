//! Risk collaborator interface
//!
//! The engine performs no risk checks. Callers run `validate_order` before
//! handing an order to the engine and update positions from the fills.

use crate::ids::Symbol;
use crate::order::Order;
use crate::position::Position;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of a pre-trade risk check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCheckResult {
    /// Passed all risk checks
    Pass,
    /// Failed: resulting position would exceed the limit
    PositionLimitExceeded {
        limit: Decimal,
        requested: Decimal,
    },
    /// Failed: trading halted for the symbol
    Halted,
}

impl RiskCheckResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, RiskCheckResult::Pass)
    }
}

/// Operations the engine's callers consume from the Risk component
pub trait RiskGate {
    /// Check an order against the current position
    fn validate_order(&self, order: &Order, position: &Position) -> RiskCheckResult;

    /// Current position for a symbol (flat if never traded)
    fn get_position(&self, symbol: &Symbol) -> Position;

    /// Replace the stored position
    fn update_position(&mut self, position: Position);
}
