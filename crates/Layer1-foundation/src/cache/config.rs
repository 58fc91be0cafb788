//! Cache configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Operation names used as TTL keys and metric names
pub mod operations {
    pub const EXTRACT: &str = "extract";
    pub const SUMMARIZE: &str = "summarize";
    pub const ANSWER: &str = "answer";
    pub const TRANSLATE: &str = "translate";
    pub const SEARCH: &str = "search";
}

/// Result cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Maximum number of live entries
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// TTL for operations without an explicit entry (seconds)
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Per-operation TTL overrides (seconds)
    #[serde(default = "default_operation_ttls")]
    pub operation_ttls: BTreeMap<String, u64>,

    /// Background sweep period (seconds, 0 = lazy expiry only)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

// Default value functions
fn default_max_entries() -> usize {
    64
}
fn default_ttl_secs() -> u64 {
    1800
} // 30 minutes
fn default_sweep_interval_secs() -> u64 {
    300
}
fn default_operation_ttls() -> BTreeMap<String, u64> {
    BTreeMap::from([
        (operations::EXTRACT.to_string(), 1800),
        (operations::SUMMARIZE.to_string(), 1800),
        (operations::ANSWER.to_string(), 900),
        (operations::TRANSLATE.to_string(), 1800),
        (operations::SEARCH.to_string(), 3600), // literature changes slowly
    ])
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            default_ttl_secs: default_ttl_secs(),
            operation_ttls: default_operation_ttls(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    /// TTL for an operation, falling back to the default TTL
    pub fn ttl_for(&self, operation: &str) -> Duration {
        let secs = self
            .operation_ttls
            .get(operation)
            .copied()
            .unwrap_or(self.default_ttl_secs);
        Duration::from_secs(secs)
    }

    /// Override the TTL of one operation
    pub fn with_ttl(mut self, operation: impl Into<String>, ttl: Duration) -> Self {
        self.operation_ttls.insert(operation.into(), ttl.as_secs());
        self
    }

    /// Sweep period, `None` when sweeping is disabled
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Create a minimal config for resource-constrained environments
    pub fn minimal() -> Self {
        Self {
            max_entries: 16,
            default_ttl_secs: 900, // 15 minutes
            operation_ttls: default_operation_ttls()
                .into_iter()
                .map(|(op, secs)| (op, secs / 2))
                .collect(),
            sweep_interval_secs: 60,
        }
    }

    /// Create an aggressive caching config for performance
    pub fn performance() -> Self {
        Self {
            max_entries: 256,
            default_ttl_secs: 3600, // 1 hour
            operation_ttls: default_operation_ttls()
                .into_iter()
                .map(|(op, secs)| (op, secs * 2))
                .collect(),
            sweep_interval_secs: 600,
        }
    }
}
