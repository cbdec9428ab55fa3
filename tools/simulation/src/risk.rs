//! Position-limit risk gate
//!
//! Pre-trade check used by the trading session: an order passes when the
//! position it would leave behind, assuming a complete fill, stays within
//! the symbol's limit. Cancels always pass, even for halted symbols.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use tracing::{info, warn};
use types::ids::Symbol;
use types::order::{Order, OrderKind};
use types::position::Position;
use types::risk::{RiskCheckResult, RiskGate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionLimitGate {
    /// Limit given to symbols that have never traded
    default_limit: Decimal,
    positions: BTreeMap<Symbol, Position>,
    halted: BTreeSet<Symbol>,
}

impl PositionLimitGate {
    pub fn new(default_limit: Decimal) -> Self {
        Self {
            default_limit,
            positions: BTreeMap::new(),
            halted: BTreeSet::new(),
        }
    }

    /// Override the limit for one symbol, keeping its current quantity
    pub fn set_limit(&mut self, symbol: Symbol, max_position: Decimal) {
        let mut position = self.get_position(&symbol);
        position.max_position = max_position;
        self.positions.insert(symbol, position);
    }

    /// Record a signed fill (+ bought, - sold)
    pub fn apply_fill(&mut self, symbol: &Symbol, signed_quantity: Decimal) -> Position {
        let position = self.get_position(symbol).apply(signed_quantity);
        if !position.is_within_limit() {
            // Resting orders filled later can overshoot the limit checked at entry
            warn!(
                symbol = %symbol,
                quantity = %position.quantity,
                limit = %position.max_position,
                "Position beyond limit after fill"
            );
        }
        self.update_position(position.clone());
        position
    }

    pub fn halt(&mut self, symbol: Symbol) {
        info!(symbol = %symbol, "Trading halted");
        self.halted.insert(symbol);
    }

    pub fn resume(&mut self, symbol: &Symbol) {
        if self.halted.remove(symbol) {
            info!(symbol = %symbol, "Trading resumed");
        }
    }

    pub fn is_halted(&self, symbol: &Symbol) -> bool {
        self.halted.contains(symbol)
    }

    /// Every symbol with a recorded position
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }
}

impl RiskGate for PositionLimitGate {
    fn validate_order(&self, order: &Order, position: &Position) -> RiskCheckResult {
        if order.kind == OrderKind::Cancel {
            return RiskCheckResult::Pass;
        }
        if self.is_halted(&order.symbol) {
            return RiskCheckResult::Halted;
        }

        let resulting = position.quantity.saturating_add(order.signed_quantity());
        if resulting.abs() > position.max_position {
            return RiskCheckResult::PositionLimitExceeded {
                limit: position.max_position,
                requested: resulting,
            };
        }
        RiskCheckResult::Pass
    }

    fn get_position(&self, symbol: &Symbol) -> Position {
        self.positions
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Position::flat(symbol.clone(), self.default_limit))
    }

    fn update_position(&mut self, position: Position) {
        self.positions.insert(position.symbol.clone(), position);
    }
}
