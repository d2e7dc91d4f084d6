//! Reservation lock descriptor carried by a reserved stall.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::requester::{Requester, RequesterRole};

/// A time-bounded exclusive claim on a stall.
///
/// Not a standalone record: it only ever exists embedded in a [`Stall`]
/// whose status is `reserved`.
///
/// [`Stall`]: super::Stall
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StallLock {
    /// Identifier shared by every stall locked in the same acquire call.
    pub lock_id: Uuid,
    /// Requester holding the lock.
    pub owner_id: Uuid,
    /// Role the owner acquired the lock under.
    pub role: RequesterRole,
    /// Instant after which the lock no longer protects the stall.
    pub expires_at: DateTime<Utc>,
}

impl StallLock {
    /// Creates a lock for `owner` valid for `ttl` from `now`.
    pub fn new(lock_id: Uuid, owner: &Requester, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            lock_id,
            owner_id: owner.id,
            role: owner.role,
            expires_at: now + ttl,
        }
    }

    /// A lock whose expiry is at or before `now` is dead.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
