//! Expired stall lock reclamation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use stallhub_core::result::AppResult;
use stallhub_database::BookingStore;

/// Frees stalls whose reservation outlived its TTL.
///
/// The sweep matches on expiry alone, never on lock id, and is a single
/// bulk conditional write. Running it concurrently with itself or with live
/// allocations is safe: a live lock is never touched, and an allocation
/// whose lock was reclaimed fails its confirm.
#[derive(Debug, Clone)]
pub struct LockReaper {
    /// Storage backend
    store: Arc<dyn BookingStore>,
}

impl LockReaper {
    /// Create a new reaper
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Reclaim every lock expired as of now. Returns the number of stalls freed.
    pub async fn sweep(&self) -> AppResult<u64> {
        self.sweep_at(Utc::now()).await
    }

    /// Reclaim every lock expired at or before `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let released = self.store.release_expired_locks(now).await?;
        if released > 0 {
            tracing::info!(released, "Lock reaper reclaimed expired reservations");
        } else {
            tracing::trace!("Lock reaper found nothing to reclaim");
        }
        Ok(released)
    }
}
