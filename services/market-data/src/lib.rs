//! Market Data Service
//!
//! Microstructure analytics over the matching engine's books:
//! - Instantaneous spread, mid, micro price, volume imbalance and depth
//! - Bounded rolling history of every recorded metric
//! - Windowed average spread and historical volatility
//! - Non-mutating market impact simulation with an audit trail
//! - Order flow toxicity and effective spread
//! - Text depth reports, owned book views and state checksums
//! - Per-symbol inbound queues and async shard workers
//!
//! # Architecture
//!
//! ```text
//!  Orders / Snapshots
//!        │
//!   ┌────▼─────┐
//!   │ Inbound  │  ← per-symbol FIFO or shard channel
//!   └────┬─────┘
//!        │
//! ┌──────▼────────────────┐
//! │  OrderBookProcessor   │
//! │  ┌────────────────┐   │
//! │  │ MatchingEngine │   │
//! │  └───────┬────────┘   │
//! │          │ metrics    │
//! │  ┌───────▼────────┐   │
//! │  │  HistoryStore  │   │
//! │  └────────────────┘   │
//! └──────┬────────────────┘
//!        │ read-only queries
//!   spread / impact / toxicity / report
//! ```

pub mod config;
pub mod dispatch;
pub mod history;
pub mod impact;
pub mod metrics;
pub mod processor;
pub mod snapshot;
pub mod toxicity;

pub use config::{AnalyticsConfig, ConfigError, QueueConfig};
pub use dispatch::{spawn_shard, Applied, Inbound, InboundQueue, QueueError, ShardClient, ShardHandle};
pub use history::{ImpactRecord, Metric, MetricSample, TradePrint};
pub use impact::MarketImpact;
pub use metrics::EffectiveSpread;
pub use processor::OrderBookProcessor;
pub use snapshot::{BookView, DepthLevel};
pub use toxicity::ToxicityReport;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
