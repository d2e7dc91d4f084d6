//! Allocation configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for stall allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// How long a stall reservation lives before the reaper may reclaim it.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_seconds: u64,
    /// Acquire stall locks in sorted id order instead of request order.
    ///
    /// Sorting removes the symmetric partial-acquire livelock between
    /// overlapping requests but changes which stall a conflict names.
    #[serde(default)]
    pub sorted_lock_order: bool,
    /// Invoice sequence counter settings.
    #[serde(default)]
    pub sequence: SequenceConfig,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            lock_ttl_seconds: default_lock_ttl(),
            sorted_lock_order: false,
            sequence: SequenceConfig::default(),
        }
    }
}

impl BookingConfig {
    /// Lock TTL as a duration.
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_seconds)
    }
}

/// Retry policy for the invoice sequence counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Retries after the first failed increment before falling back to a
    /// provisional number.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff between retries in milliseconds (multiplied by the retry count).
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_lock_ttl() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    50
}
