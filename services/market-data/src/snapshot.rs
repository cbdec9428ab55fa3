//! Book views, the text depth report and state checksums
//!
//! `BookView` is the owned copy handed to strategies. The text report is a
//! debugging aid with no format guarantee. The checksum is a SHA-256 digest
//! over every ladder entry and every history series, used to compare two
//! replays for bit-identical state.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use types::ids::Symbol;
use types::numeric::{Price, Quantity};
use types::order::Side;

use matching_engine::book::PriceLevel;
use matching_engine::{MatchingEngine, OrderBook};

use crate::history::{HistoryStore, Metric};
use crate::metrics;

/// One aggregated price level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Price,
    pub quantity: Quantity,
    /// Number of resting entries at this price
    pub entries: usize,
}

impl DepthLevel {
    fn from_level(price: Price, level: &PriceLevel) -> Self {
        Self {
            price,
            quantity: level.total_quantity(),
            entries: level.order_count(),
        }
    }
}

/// Owned, serializable top-of-book copy for collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookView {
    pub symbol: Symbol,
    /// Best first
    pub bids: Vec<DepthLevel>,
    /// Best first
    pub asks: Vec<DepthLevel>,
    pub last_trade_price: Option<Price>,
    pub timestamp: u64,
}

impl BookView {
    pub fn from_book(book: &OrderBook, depth: usize) -> Self {
        Self {
            symbol: book.symbol().clone(),
            bids: book
                .bids()
                .levels()
                .take(depth)
                .map(|(price, level)| DepthLevel::from_level(price, level))
                .collect(),
            asks: book
                .asks()
                .levels()
                .take(depth)
                .map(|(price, level)| DepthLevel::from_level(price, level))
                .collect(),
            last_trade_price: book.last_trade_price(),
            timestamp: book.last_update(),
        }
    }

    /// View of a symbol with no book
    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: Vec::new(),
            asks: Vec::new(),
            last_trade_price: None,
            timestamp: 0,
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        let bid = self.best_bid()?.as_decimal();
        let ask = self.best_ask()?.as_decimal();
        Some(metrics::midpoint(bid, ask))
    }

    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()?.as_decimal() - self.best_bid()?.as_decimal())
    }
}

/// Render the top `depth` levels per side as a human-readable report
///
/// Asks are printed above bids, each side best-first.
pub fn render_report(symbol: &Symbol, book: Option<&OrderBook>, depth: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} order book (top {}) ===", symbol, depth);

    let Some(book) = book else {
        let _ = writeln!(out, "(no book)");
        return out;
    };

    match book.last_trade_price() {
        Some(price) => {
            let _ = writeln!(out, "last trade: {}  updated: {}", price, book.last_update());
        }
        None => {
            let _ = writeln!(out, "last trade: -  updated: {}", book.last_update());
        }
    }

    let _ = writeln!(out, "ASKS");
    write_side(&mut out, book.asks().levels().take(depth));

    match (metrics::spread(book), metrics::mid_price(book)) {
        (Ok(spread), Ok(mid)) => {
            let _ = writeln!(out, "---- spread {}  mid {} ----", spread, mid);
        }
        _ => {
            let _ = writeln!(out, "---- one-sided ----");
        }
    }

    let _ = writeln!(out, "BIDS");
    write_side(&mut out, book.bids().levels().take(depth));
    out
}

fn write_side<'a>(out: &mut String, levels: impl Iterator<Item = (Price, &'a PriceLevel)>) {
    let mut any = false;
    for (price, level) in levels {
        any = true;
        let _ = writeln!(
            out,
            "  {:>12} x {:<12} ({} entries)",
            price.to_string(),
            level.total_quantity().to_string(),
            level.order_count()
        );
    }
    if !any {
        let _ = writeln!(out, "  (empty)");
    }
}

/// SHA-256 hex digest over all ladders and history
///
/// Ladder entries are hashed in matching order with their ranks, so two
/// states hash equal only if they would match identically.
pub fn state_checksum(engine: &MatchingEngine, history: &HistoryStore) -> String {
    let mut hasher = Sha256::new();

    for book in engine.books() {
        hasher.update(book.symbol().as_str().as_bytes());
        hasher.update(b"|");
        for side in [Side::Buy, Side::Sell] {
            hasher.update(side.as_str().as_bytes());
            for (price, entry) in book.resting_entries(side) {
                hasher.update(price.to_string().as_bytes());
                hasher.update(b":");
                hasher.update(entry.remaining.to_string().as_bytes());
                hasher.update(b":");
                hasher.update(entry.priority.to_le_bytes());
                hasher.update(entry.order_id.as_ref().map_or("", |id| id.as_str()).as_bytes());
                hasher.update(b"|");
            }
            hasher.update(b"---");
        }
        if let Some(price) = book.last_trade_price() {
            hasher.update(price.to_string().as_bytes());
        }
        hasher.update(book.last_update().to_le_bytes());
    }

    for (symbol, symbol_history) in history.symbols() {
        hasher.update(symbol.as_str().as_bytes());
        for metric in Metric::ALL {
            hasher.update(metric.as_str().as_bytes());
            if let Some(series) = symbol_history.metric(metric) {
                for sample in series.iter() {
                    hasher.update(sample.timestamp.to_le_bytes());
                    hasher.update(sample.value.to_string().as_bytes());
                    hasher.update(b"|");
                }
            }
        }
        for record in symbol_history.impacts().iter() {
            hasher.update(record.timestamp.to_le_bytes());
            hasher.update(record.quantity.to_string().as_bytes());
            hasher.update(record.side.as_str().as_bytes());
            hasher.update(record.fill_ratio.to_string().as_bytes());
            hasher.update(b"|");
        }
        for print in symbol_history.trades().iter() {
            hasher.update(print.timestamp.to_le_bytes());
            hasher.update(print.price.to_string().as_bytes());
            hasher.update(print.quantity.to_string().as_bytes());
            hasher.update(print.mid.to_string().as_bytes());
            hasher.update(b"|");
        }
    }

    format!("{:x}", hasher.finalize())
}
