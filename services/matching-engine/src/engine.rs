//! Matching engine core
//!
//! Routes orders and market data updates to per-symbol books. Books are
//! created lazily on the first LIMIT/MARKET order or snapshot for a symbol.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use types::errors::BookError;
use types::ids::Symbol;
use types::market::MarketSnapshot;
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderKind};

use crate::book::OrderBook;
use crate::events::{ExecutionReport, SnapshotApplied};

/// Main matching engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchingEngine {
    /// Order books per symbol, ordered for deterministic iteration
    books: BTreeMap<Symbol, OrderBook>,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit an order to the matching engine
    ///
    /// This is the main entry point. A rejected order leaves every book
    /// unchanged and does not create a book for an unseen symbol.
    pub fn process_order(&mut self, order: Order) -> Result<ExecutionReport, BookError> {
        let result = self.route_order(order);
        match &result {
            Ok(report) => debug!(
                symbol = %report.symbol,
                order_id = %report.order_id,
                trades = report.trades.len(),
                filled = %report.filled,
                "Order processed"
            ),
            Err(error) => warn!(%error, "Order rejected"),
        }
        result
    }

    fn route_order(&mut self, order: Order) -> Result<ExecutionReport, BookError> {
        order.validate()?;

        match order.kind {
            OrderKind::Cancel | OrderKind::Modify => match self.books.get_mut(&order.symbol) {
                Some(book) => book.process_order(order),
                None => Err(BookError::UnknownOrder {
                    symbol: order.symbol,
                    order_id: order.order_id,
                }),
            },
            OrderKind::Limit | OrderKind::Market => {
                if let Some(book) = self.books.get_mut(&order.symbol) {
                    return book.process_order(order);
                }
                let mut book = OrderBook::new(order.symbol.clone());
                let report = book.process_order(order)?;
                self.books.insert(book.symbol().clone(), book);
                Ok(report)
            }
        }
    }

    /// Replace a symbol's ladders with an external snapshot
    pub fn process_market_data_update(
        &mut self,
        snapshot: &MarketSnapshot,
    ) -> Result<SnapshotApplied, BookError> {
        snapshot.validate()?;

        let result = match self.books.get_mut(&snapshot.symbol) {
            Some(book) => book.apply_snapshot(snapshot),
            None => {
                let mut book = OrderBook::new(snapshot.symbol.clone());
                let applied = book.apply_snapshot(snapshot)?;
                self.books.insert(snapshot.symbol.clone(), book);
                Ok(applied)
            }
        };

        match &result {
            Ok(applied) => debug!(
                symbol = %applied.symbol,
                bids = applied.bid_entries,
                asks = applied.ask_entries,
                displaced = applied.displaced_orders,
                "Snapshot applied"
            ),
            Err(error) => warn!(symbol = %snapshot.symbol, %error, "Snapshot rejected"),
        }
        result
    }

    pub fn book(&self, symbol: &Symbol) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    /// Symbols with a book, in sorted order
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.books.keys()
    }

    pub fn books(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.values()
    }

    /// Get order book depth snapshot
    pub fn get_order_book(&self, symbol: &Symbol, depth: usize) -> Option<OrderBookSnapshot> {
        self.books.get(symbol).map(|book| OrderBookSnapshot {
            symbol: symbol.clone(),
            bids: book.bids().depth_snapshot(depth),
            asks: book.asks().depth_snapshot(depth),
        })
    }

    /// Drop every book and registry
    pub fn reset(&mut self) {
        self.books.clear();
    }
}

/// Aggregated depth for one symbol, best-first per side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}
