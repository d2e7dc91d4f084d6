//! Invoice sequence minting.
//!
//! Values come from the store's atomic `(name, year)` counter. When the
//! store stays unreachable through every retry, a timestamp-derived value
//! is handed out instead and flagged as [`SequenceValue::Uncertain`] so a
//! booking is never blocked on numbering.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, warn};

use stallhub_core::config::SequenceConfig;
use stallhub_database::BookingStore;

/// Upper bound for provisional values, keeping rendered numbers short.
const PROVISIONAL_MODULUS: i64 = 10_000_000;

/// A minted sequence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceValue {
    /// Minted by the counter; unique for its key and year.
    Assigned(i64),
    /// Derived from the clock after the counter failed; may collide.
    Uncertain(i64),
}

impl SequenceValue {
    /// The raw number, whichever way it was obtained.
    pub fn value(&self) -> i64 {
        match self {
            Self::Assigned(v) | Self::Uncertain(v) => *v,
        }
    }

    /// Whether the value is not guaranteed unique.
    pub fn is_uncertain(&self) -> bool {
        matches!(self, Self::Uncertain(_))
    }
}

/// Mints per-`(key, year)` sequence numbers with retry and fallback.
#[derive(Debug, Clone)]
pub struct SequenceCounter {
    store: Arc<dyn BookingStore>,
    max_retries: u32,
    backoff: Duration,
}

impl SequenceCounter {
    /// Creates a counter over `store`.
    pub fn new(store: Arc<dyn BookingStore>, config: &SequenceConfig) -> Self {
        Self {
            store,
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    /// Returns the next value for `key` in `year`.
    ///
    /// A transient store error is retried up to `max_retries` times with
    /// linear backoff; each retry is a fresh increment, so no value is ever
    /// reused. Never fails.
    pub async fn next(&self, key: &str, year: i32) -> SequenceValue {
        let mut retries = 0;
        loop {
            match self.store.increment_sequence(key, year).await {
                Ok(value) => return SequenceValue::Assigned(value),
                Err(e) if e.is_transient() && retries < self.max_retries => {
                    retries += 1;
                    warn!(
                        key = %key,
                        year,
                        retry = retries,
                        max_retries = self.max_retries,
                        error = %e,
                        "Sequence increment failed, retrying"
                    );
                    tokio::time::sleep(self.backoff * retries).await;
                }
                Err(e) => {
                    error!(
                        key = %key,
                        year,
                        retries,
                        error = %e,
                        "Sequence counter unavailable"
                    );
                    break;
                }
            }
        }

        let value = Utc::now().timestamp_millis().rem_euclid(PROVISIONAL_MODULUS);
        error!(
            key = %key,
            year,
            value,
            "Issuing provisional sequence value; uniqueness is not guaranteed"
        );
        SequenceValue::Uncertain(value)
    }
}
