//! Stall lock manager.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, warn};
use uuid::Uuid;

use stallhub_core::config::BookingConfig;
use stallhub_database::StoreSession;
use stallhub_entity::requester::Requester;
use stallhub_entity::stall::{StallLock, StallStatus};

use super::error::{ConflictReason, LockError};

/// Stalls locked together by one acquire call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    /// Lock id stamped on every stall in `stall_ids`.
    pub lock_id: Uuid,
    /// Locked stalls, in acquisition order.
    pub stall_ids: Vec<Uuid>,
    /// When the locks stop protecting the stalls.
    pub expires_at: DateTime<Utc>,
}

/// Acquires, releases and confirms stall locks through a [`StoreSession`].
///
/// Each stall transition is one conditional write in the store; the
/// manager itself holds no state between calls.
#[derive(Debug, Clone)]
pub struct LockManager {
    ttl: Duration,
    sorted: bool,
}

impl LockManager {
    /// Creates a lock manager from allocation settings.
    pub fn new(config: &BookingConfig) -> Self {
        Self {
            ttl: Duration::seconds(config.lock_ttl_seconds as i64),
            sorted: config.sorted_lock_order,
        }
    }

    /// Creates a lock manager with an explicit TTL, acquiring in request order.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl, sorted: false }
    }

    /// Lock lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Locks every stall in `stall_ids` for `owner` under one fresh lock id.
    ///
    /// Stalls are taken one at a time. On the first stall that cannot be
    /// taken, every stall already locked by this call is released again
    /// and the conflict names the failing stall.
    pub async fn acquire(
        &self,
        session: &mut dyn StoreSession,
        stall_ids: &[Uuid],
        owner: &Requester,
    ) -> Result<LockHandle, LockError> {
        let mut order = stall_ids.to_vec();
        if self.sorted {
            order.sort_unstable();
        }

        let now = Utc::now();
        let lock = StallLock::new(Uuid::new_v4(), owner, now, self.ttl);
        let mut acquired = Vec::with_capacity(order.len());

        for stall_id in order {
            let locked = match session.lock_stall(stall_id, &lock, now).await {
                Ok(locked) => locked,
                Err(e) => {
                    self.release_partial(session, &acquired, lock.lock_id).await;
                    return Err(e.into());
                }
            };

            if !locked {
                self.release_partial(session, &acquired, lock.lock_id).await;
                let reason = self.classify(session, stall_id).await;
                warn!(
                    stall_id = %stall_id,
                    reason = %reason,
                    owner_id = %owner.id,
                    "Stall lock conflict"
                );
                return Err(LockError::Conflict { stall_id, reason });
            }
            acquired.push(stall_id);
        }

        debug!(
            lock_id = %lock.lock_id,
            stalls = acquired.len(),
            expires_at = %lock.expires_at,
            "Stalls locked"
        );

        Ok(LockHandle {
            lock_id: lock.lock_id,
            stall_ids: acquired,
            expires_at: lock.expires_at,
        })
    }

    /// Releases the stalls held under `lock_id`. Stalls under any other lock
    /// are left alone, so calling this twice is harmless.
    pub async fn release(
        &self,
        session: &mut dyn StoreSession,
        stall_ids: &[Uuid],
        lock_id: Uuid,
    ) -> Result<u64, LockError> {
        let released = session.release_stalls(stall_ids, lock_id).await?;
        debug!(lock_id = %lock_id, released, "Stall locks released");
        Ok(released)
    }

    /// Converts the reservation held under `lock_id` into a booking.
    ///
    /// Fails with [`LockError::ConfirmMismatch`] if any stall is no longer
    /// held by `lock_id`, which happens when the lock expired and was
    /// reclaimed or taken over before confirm.
    pub async fn confirm(
        &self,
        session: &mut dyn StoreSession,
        stall_ids: &[Uuid],
        lock_id: Uuid,
        booking_id: Uuid,
    ) -> Result<(), LockError> {
        let expected = stall_ids.len() as u64;
        let confirmed = session
            .confirm_stalls(stall_ids, lock_id, booking_id)
            .await?;

        if confirmed != expected {
            error!(
                lock_id = %lock_id,
                booking_id = %booking_id,
                expected,
                confirmed,
                "Stall confirm count mismatch"
            );
            return Err(LockError::ConfirmMismatch {
                lock_id,
                expected,
                confirmed,
            });
        }
        Ok(())
    }

    async fn release_partial(
        &self,
        session: &mut dyn StoreSession,
        acquired: &[Uuid],
        lock_id: Uuid,
    ) {
        if acquired.is_empty() {
            return;
        }
        if let Err(e) = session.release_stalls(acquired, lock_id).await {
            error!(
                lock_id = %lock_id,
                stalls = acquired.len(),
                error = %e,
                "Failed to release partially acquired stalls"
            );
        }
    }

    async fn classify(&self, session: &mut dyn StoreSession, stall_id: Uuid) -> ConflictReason {
        match session.find_stall(stall_id).await {
            Ok(None) => ConflictReason::NotFound,
            Ok(Some(stall)) if stall.status() == StallStatus::Booked => ConflictReason::Booked,
            Ok(Some(_)) => ConflictReason::Locked,
            Err(e) => {
                warn!(stall_id = %stall_id, error = %e, "Could not classify lock conflict");
                ConflictReason::Locked
            }
        }
    }
}
