//! Demonstration run
//!
//! Feeds seeded snapshots and order flow for two symbols through a trading
//! session with the default strategies, then prints depth reports and the
//! analytics for each symbol.
//!
//! Usage: `demo [seed] [steps]`. Set `RUST_LOG=debug` for per-order logs.

use simulation::{FlowConfig, OrderFlowGenerator, SessionConfig, TradingSession};
use tracing_subscriber::EnvFilter;
use types::ids::Symbol;
use types::numeric::Quantity;
use types::order::Side;

const SNAPSHOT_EVERY: u64 = 25;
const REPORT_DEPTH: usize = 5;
const LOOKBACK: usize = 50;

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(42);
    let steps: u64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(1_000);

    tracing::info!(seed, steps, "Starting demo session");

    let mut session = TradingSession::new(SessionConfig::default())?;
    let mut generators = vec![
        OrderFlowGenerator::new(Symbol::new("AAPL"), FlowConfig { seed, ..FlowConfig::default() })?,
        OrderFlowGenerator::new(
            Symbol::new("MSFT"),
            FlowConfig {
                seed: seed.wrapping_add(1),
                start_price: "410.00".parse()?,
                ..FlowConfig::default()
            },
        )?,
    ];

    for step in 0..steps {
        // One microsecond per step
        let timestamp = (step + 1) * 1_000;
        for flow in generators.iter_mut() {
            if step % SNAPSHOT_EVERY == 0 {
                session.submit_market_data(flow.next_snapshot(timestamp))?;
            } else {
                session.submit_order(flow.next_order(timestamp))?;
            }
        }
        session.run();
    }

    for flow in &generators {
        let symbol = flow.symbol();

        // Impact what-ifs on both sides feed the toxicity analysis
        for side in [Side::Buy, Side::Sell] {
            let impact = session
                .processor_mut()
                .calculate_market_impact(symbol, Quantity::from_u64(250), side)?;
            tracing::info!(
                %symbol,
                %side,
                fill_ratio = %impact.fill_ratio,
                price_impact = ?impact.price_impact,
                "Impact of a 250 lot sweep"
            );
        }

        let processor = session.processor();
        println!("{}", processor.get_order_book_snapshot(symbol, REPORT_DEPTH));
        for (metric, value) in processor.latest_metrics(symbol) {
            println!("  {:<20} {}", metric.as_str(), value.round_dp(6));
        }
        match processor.average_spread(symbol, LOOKBACK) {
            Ok(avg) => println!("  {:<20} {}", "average_spread", avg.round_dp(6)),
            Err(e) => println!("  {:<20} n/a ({})", "average_spread", e),
        }
        match processor.historical_vol(symbol, LOOKBACK) {
            Ok(vol) => println!("  {:<20} {}", "volatility", vol.round_dp(8)),
            Err(e) => println!("  {:<20} n/a ({})", "volatility", e),
        }
        match processor.calculate_effective_spread(symbol, LOOKBACK) {
            Ok(effective) => println!("  {:<20} {}", "effective_spread", effective.mean_absolute.round_dp(6)),
            Err(e) => println!("  {:<20} n/a ({})", "effective_spread", e),
        }
        let toxicity = processor.analyze_order_flow_toxicity(symbol, 2)?;
        println!("  {:<20} {}", "toxicity_score", toxicity.toxicity_score.round_dp(6));
        println!("  {:<20} {}", "position", session.position(symbol).quantity);
        println!();
    }

    let stats = session.stats();
    println!(
        "applied={} rejected={} risk_rejected={} strategy_orders={} trades={}",
        stats.applied, stats.rejected, stats.risk_rejected, stats.strategy_orders, stats.trades
    );
    println!("checksum={}", session.processor().state_checksum());
    Ok(())
}
