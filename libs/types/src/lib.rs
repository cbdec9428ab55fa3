//! Types library for the limit order book engine
//!
//! Core type definitions shared by the matching engine, the analytics layer
//! and the simulation tools. All numeric values are fixed-point decimals so
//! that replaying the same operations reproduces the same state exactly.
//!
//! # Modules
//! - `ids`: Order and symbol identifiers
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `order`: Order requests (limit, market, cancel, modify)
//! - `trade`: Trade execution types
//! - `market`: External market data snapshots
//! - `position`: Position tracking types
//! - `risk`: Risk collaborator interface
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;
pub mod market;
pub mod position;
pub mod risk;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::trade::*;
    pub use crate::market::*;
    pub use crate::position::*;
    pub use crate::risk::*;
    pub use crate::errors::*;
}
