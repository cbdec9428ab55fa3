//! Position tracking types
//!
//! Owned by the Risk collaborator; the engine never reads or writes positions.

use crate::ids::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Net position in one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    /// Signed net quantity: positive = long, negative = short
    pub quantity: Decimal,
    /// Maximum absolute net quantity allowed
    pub max_position: Decimal,
}

impl Position {
    /// Flat position with the given limit
    pub fn flat(symbol: impl Into<Symbol>, max_position: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: Decimal::ZERO,
            max_position,
        }
    }

    /// Position after applying a signed quantity change, saturating at the decimal range
    pub fn apply(&self, signed_quantity: Decimal) -> Self {
        Self {
            symbol: self.symbol.clone(),
            quantity: self.quantity.saturating_add(signed_quantity),
            max_position: self.max_position,
        }
    }

    pub fn is_within_limit(&self) -> bool {
        self.quantity.abs() <= self.max_position
    }
}
