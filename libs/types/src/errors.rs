//! Error types for the order book engine
//!
//! Every condition is local and recoverable: the engine reports it to the
//! caller and keeps running with its state unchanged.

use thiserror::Error;

use crate::ids::{OrderId, Symbol};

/// Errors reported by book operations and metric queries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error("Invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("Unknown order: {order_id} is not resting on {symbol}")]
    UnknownOrder { symbol: Symbol, order_id: OrderId },

    #[error("Insufficient liquidity on {symbol}: {side} side empty")]
    InsufficientLiquidity { symbol: Symbol, side: &'static str },

    #[error("Insufficient history for {metric}: requested {requested}, available {available}")]
    InsufficientHistory {
        metric: String,
        requested: usize,
        available: usize,
    },

    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    #[error("Arithmetic overflow computing {metric}")]
    ArithmeticOverflow { metric: String },
}

impl BookError {
    pub fn invalid_order(reason: impl Into<String>) -> Self {
        BookError::InvalidOrder { reason: reason.into() }
    }

    pub fn invalid_snapshot(reason: impl Into<String>) -> Self {
        BookError::InvalidSnapshot { reason: reason.into() }
    }

    pub fn overflow(metric: impl Into<String>) -> Self {
        BookError::ArithmeticOverflow { metric: metric.into() }
    }

    pub fn insufficient_history(metric: impl Into<String>, requested: usize, available: usize) -> Self {
        BookError::InsufficientHistory {
            metric: metric.into(),
            requested,
            available,
        }
    }
}
