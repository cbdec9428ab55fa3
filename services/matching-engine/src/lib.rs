//! Matching Engine Service
//!
//! In-memory limit order books with price-time priority matching for
//! LIMIT, MARKET, CANCEL and MODIFY requests, plus wholesale replacement of
//! a symbol's ladders from external snapshots.
//!
//! **Key Invariants:**
//! - Price-time priority strictly enforced
//! - Deterministic matching (same inputs → same outputs)
//! - Books never rest crossed
//! - Conservation of quantity

pub mod book;
pub mod engine;
pub mod events;
pub mod matching;
pub mod registry;

pub use book::OrderBook;
pub use engine::{MatchingEngine, OrderBookSnapshot};
pub use events::{ExecutionReport, OrderOutcome, SnapshotApplied};
