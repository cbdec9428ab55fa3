//! Property tests for price-time matching
//!
//! Random order streams are replayed against a single book and the
//! structural invariants are checked after every step.

use matching_engine::{MatchingEngine, OrderOutcome};
use proptest::prelude::*;
use rust_decimal::Decimal;
use types::errors::BookError;
use types::ids::Symbol;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

#[derive(Debug, Clone)]
enum Op {
    Limit { buy: bool, ticks: u64, qty: u64 },
    Market { buy: bool, qty: u64 },
    Cancel { pick: usize },
    Modify { pick: usize, ticks: u64, qty: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => (any::<bool>(), 0u64..20, 1u64..50).prop_map(|(buy, ticks, qty)| Op::Limit { buy, ticks, qty }),
        1 => (any::<bool>(), 1u64..80).prop_map(|(buy, qty)| Op::Market { buy, qty }),
        2 => (0usize..64).prop_map(|pick| Op::Cancel { pick }),
        1 => (0usize..64, 0u64..20, 1u64..50).prop_map(|(pick, ticks, qty)| Op::Modify { pick, ticks, qty }),
    ]
}

fn price(ticks: u64) -> Price {
    // 99.90 .. 100.09 in cent ticks
    Price::try_new(Decimal::new(9_990 + ticks as i64, 2)).unwrap()
}

fn side(buy: bool) -> Side {
    if buy {
        Side::Buy
    } else {
        Side::Sell
    }
}

/// Translate an op into an order; cancels and modifies target a previously issued id
fn to_order(op: &Op, seq: u64, issued: &[String]) -> Order {
    let pick_id = |pick: usize| {
        if issued.is_empty() {
            "never-issued".to_string()
        } else {
            issued[pick % issued.len()].clone()
        }
    };
    match op {
        Op::Limit { buy, ticks, qty } => Order::limit(
            format!("O{}", seq),
            "AAPL",
            side(*buy),
            price(*ticks),
            Quantity::from_u64(*qty),
            seq,
        ),
        Op::Market { buy, qty } => {
            Order::market(format!("O{}", seq), "AAPL", side(*buy), Quantity::from_u64(*qty), seq)
        }
        Op::Cancel { pick } => Order::cancel(pick_id(*pick), "AAPL", seq),
        Op::Modify { pick, ticks, qty } => {
            let id = pick_id(*pick);
            // Keep the original side so modifies look like real amendments
            let buy = id.len() % 2 == 0;
            Order::modify(id, "AAPL", side(buy), price(*ticks), Quantity::from_u64(*qty), seq)
        }
    }
}

fn resting_total(engine: &MatchingEngine) -> Decimal {
    engine
        .book(&Symbol::new("AAPL"))
        .map(|book| {
            book.bids().total_quantity(usize::MAX).as_decimal()
                + book.asks().total_quantity(usize::MAX).as_decimal()
        })
        .unwrap_or(Decimal::ZERO)
}

fn run(ops: &[Op]) -> Vec<Result<matching_engine::ExecutionReport, BookError>> {
    let mut engine = MatchingEngine::new();
    let mut issued = Vec::new();
    let mut results = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        let order = to_order(op, i as u64 + 1, &issued);
        if matches!(op, Op::Limit { .. }) {
            issued.push(order.order_id.as_str().to_string());
        }
        results.push(engine.process_order(order));
    }
    results
}

proptest! {
    #[test]
    fn book_invariants_hold_after_every_order(ops in prop::collection::vec(op_strategy(), 1..120)) {
        let mut engine = MatchingEngine::new();
        let mut issued = Vec::new();

        for (i, op) in ops.iter().enumerate() {
            let order = to_order(op, i as u64 + 1, &issued);
            if matches!(op, Op::Limit { .. }) {
                issued.push(order.order_id.as_str().to_string());
            }
            let before = engine.clone();
            let resting_before = resting_total(&engine);
            let requested = order.quantity.as_decimal();
            let limit = order.price;
            let order_side = order.side;

            match engine.process_order(order) {
                Ok(report) => {
                    let traded: Decimal = report.trades.iter().map(|t| t.quantity.as_decimal()).sum();
                    prop_assert_eq!(traded, report.filled.as_decimal());

                    // Execution happens at the resting price, never through the limit
                    if matches!(op, Op::Limit { .. } | Op::Modify { .. }) {
                        for trade in &report.trades {
                            match order_side {
                                Side::Buy => prop_assert!(trade.price <= limit),
                                Side::Sell => prop_assert!(trade.price >= limit),
                            }
                        }
                    }

                    let resting_after = resting_total(&engine);
                    match &report.outcome {
                        OrderOutcome::Filled => {
                            prop_assert_eq!(report.filled.as_decimal(), requested);
                            if matches!(op, Op::Limit { .. } | Op::Market { .. }) {
                                prop_assert_eq!(resting_after, resting_before - requested);
                            }
                        }
                        OrderOutcome::Resting { remaining, .. } => {
                            prop_assert_eq!(report.filled.as_decimal() + remaining.as_decimal(), requested);
                        }
                        OrderOutcome::Unfilled { discarded } => {
                            prop_assert_eq!(report.filled.as_decimal() + discarded.as_decimal(), requested);
                            prop_assert_eq!(resting_after, resting_before - report.filled.as_decimal());
                        }
                        OrderOutcome::Canceled { remaining } => {
                            prop_assert_eq!(resting_after, resting_before - remaining.as_decimal());
                            prop_assert!(!engine
                                .book(&Symbol::new("AAPL"))
                                .map(|b| b.registry().contains(&report.order_id))
                                .unwrap_or(false));
                        }
                    }
                }
                Err(_) => {
                    // Rejections leave the engine untouched
                    prop_assert_eq!(&engine, &before);
                }
            }

            if let Some(book) = engine.book(&Symbol::new("AAPL")) {
                prop_assert_eq!(book.check_invariants(), Ok(()));
            }
        }
    }

    #[test]
    fn matching_is_deterministic(ops in prop::collection::vec(op_strategy(), 1..80)) {
        prop_assert_eq!(run(&ops), run(&ops));
    }
}

#[test]
fn test_trade_sequences_are_contiguous() {
    let mut engine = MatchingEngine::new();
    for i in 0..10u64 {
        engine
            .process_order(Order::limit(format!("S{}", i), "AAPL", Side::Sell, price(i), Quantity::from_u64(1), i))
            .unwrap();
    }

    let report = engine
        .process_order(Order::market("M", "AAPL", Side::Buy, Quantity::from_u64(10), 100))
        .unwrap();

    let sequences: Vec<u64> = report.trades.iter().map(|t| t.sequence).collect();
    assert_eq!(sequences, (1..=10).collect::<Vec<_>>());
    let prices: Vec<Price> = report.trades.iter().map(|t| t.price).collect();
    assert_eq!(prices, (0..10).map(price).collect::<Vec<_>>());
}
