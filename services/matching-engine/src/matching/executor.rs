//! Trade execution logic
//!
//! Turns a single fill into a `Trade` and hands out the per-symbol trade
//! sequence.

use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::trade::Trade;

/// Match executor for handling trade generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchExecutor {
    sequence_counter: u64,
}

impl MatchExecutor {
    /// Create a new match executor with starting sequence number
    pub fn new(starting_sequence: u64) -> Self {
        Self {
            sequence_counter: starting_sequence,
        }
    }

    /// Get next sequence number (monotonically increasing)
    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence_counter;
        self.sequence_counter += 1;
        seq
    }

    /// Sequence the next trade will receive
    pub fn peek_sequence(&self) -> u64 {
        self.sequence_counter
    }

    /// Execute a trade between a resting entry and an incoming order
    #[allow(clippy::too_many_arguments)]
    pub fn execute_trade(
        &mut self,
        symbol: &Symbol,
        maker_order_id: Option<OrderId>,
        taker_order_id: &OrderId,
        side: Side,    // Aggressor side
        price: Price,  // Execution price (resting price per price-time priority)
        quantity: Quantity,
        timestamp: u64,
    ) -> Trade {
        let sequence = self.next_sequence();

        Trade {
            sequence,
            symbol: symbol.clone(),
            maker_order_id,
            taker_order_id: taker_order_id.clone(),
            side,
            price,
            quantity,
            executed_at: timestamp,
        }
    }
}
