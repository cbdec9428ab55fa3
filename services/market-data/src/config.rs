//! Configuration for the analytics layer
//!
//! Plain structs with `Default`; every field can be overridden from JSON.

use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Sizing of the rolling history and the depth used by depth-based metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Maximum samples kept per symbol per metric.
    pub history_capacity: usize,
    /// Samples older than this (relative to the newest) are evicted. None keeps everything up to capacity.
    pub retention_ns: Option<u64>,
    /// Number of top levels per side used for imbalance and visible depth.
    pub imbalance_depth: usize,
    /// Maximum impact records kept per symbol.
    pub impact_capacity: usize,
    /// Maximum trade prints kept per symbol.
    pub trade_capacity: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            history_capacity: 10_000,
            retention_ns: None,
            imbalance_depth: 5,
            impact_capacity: 10_000,
            trade_capacity: 10_000,
        }
    }
}

impl AnalyticsConfig {
    /// Parse and validate a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("history_capacity", self.history_capacity),
            ("imbalance_depth", self.imbalance_depth),
            ("impact_capacity", self.impact_capacity),
            ("trade_capacity", self.trade_capacity),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if self.retention_ns == Some(0) {
            return Err(ConfigError::Invalid {
                field: "retention_ns",
                reason: "zero retention would discard every sample".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration for a per-symbol inbound queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum queued operations before pushes are refused.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "capacity",
                reason: "a queue must hold at least one operation".to_string(),
            });
        }
        Ok(())
    }
}
