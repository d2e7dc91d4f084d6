//! Stall entity model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use stallhub_core::error::AppError;

use super::lock::StallLock;
use super::shape::StallShape;
use super::status::StallStatus;

/// A bookable stall.
///
/// Status and lock fields are private so the invariants below can only be
/// broken by going around [`Stall::from_parts`]:
///
/// - `available` carries neither a lock nor a booking reference
/// - `reserved` carries exactly one lock and no booking reference
/// - `booked` carries no lock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stall {
    /// Unique stall identifier.
    pub id: Uuid,
    /// Exhibition the stall belongs to.
    pub exhibition_id: Uuid,
    /// Human-facing stall number (e.g. "A-12").
    pub number: String,
    /// Price per unit of floor area.
    pub rate_per_unit: Decimal,
    /// Floor geometry.
    pub shape: StallShape,
    status: StallStatus,
    lock: Option<StallLock>,
    booking_id: Option<Uuid>,
}

/// Raw stall fields as read from storage, before invariant checks.
#[derive(Debug, Clone)]
pub struct StallParts {
    /// Unique stall identifier.
    pub id: Uuid,
    /// Exhibition the stall belongs to.
    pub exhibition_id: Uuid,
    /// Human-facing stall number.
    pub number: String,
    /// Price per unit of floor area.
    pub rate_per_unit: Decimal,
    /// Floor geometry.
    pub shape: StallShape,
    /// Stored status.
    pub status: StallStatus,
    /// Stored lock descriptor, if any.
    pub lock: Option<StallLock>,
    /// Booking that confirmed the stall, if any.
    pub booking_id: Option<Uuid>,
}

impl Stall {
    /// Creates a new, available stall.
    pub fn new(
        id: Uuid,
        exhibition_id: Uuid,
        number: impl Into<String>,
        rate_per_unit: Decimal,
        shape: StallShape,
    ) -> Self {
        Self {
            id,
            exhibition_id,
            number: number.into(),
            rate_per_unit,
            shape,
            status: StallStatus::Available,
            lock: None,
            booking_id: None,
        }
    }

    /// Rebuilds a stall from stored fields, rejecting any combination of
    /// status, lock and booking reference that breaks the invariants.
    pub fn from_parts(parts: StallParts) -> Result<Self, AppError> {
        match (parts.status, &parts.lock, &parts.booking_id) {
            (StallStatus::Available, None, None) => {}
            (StallStatus::Reserved, Some(_), None) => {}
            (StallStatus::Booked, None, _) => {}
            (status, lock, booking) => {
                return Err(AppError::integrity(format!(
                    "Stall {} is {status} with lock={} booking={}",
                    parts.id,
                    lock.is_some(),
                    booking.is_some()
                )));
            }
        }

        Ok(Self {
            id: parts.id,
            exhibition_id: parts.exhibition_id,
            number: parts.number,
            rate_per_unit: parts.rate_per_unit,
            shape: parts.shape,
            status: parts.status,
            lock: parts.lock,
            booking_id: parts.booking_id,
        })
    }

    /// Current status.
    pub fn status(&self) -> StallStatus {
        self.status
    }

    /// Current lock descriptor (possibly expired).
    pub fn lock(&self) -> Option<&StallLock> {
        self.lock.as_ref()
    }

    /// Booking that confirmed the stall.
    pub fn booking_id(&self) -> Option<Uuid> {
        self.booking_id
    }

    /// Billable floor area.
    pub fn area(&self) -> Decimal {
        self.shape.area()
    }

    /// Whether a new lock may be placed at `now`.
    pub fn is_lockable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            StallStatus::Available => true,
            StallStatus::Reserved => self.lock.as_ref().is_none_or(|l| l.is_expired(now)),
            StallStatus::Booked => false,
        }
    }

    /// Places `lock` if the stall is lockable at `now`.
    pub fn try_lock(&mut self, lock: StallLock, now: DateTime<Utc>) -> bool {
        if !self.is_lockable(now) {
            return false;
        }
        self.status = StallStatus::Reserved;
        self.lock = Some(lock);
        true
    }

    /// Returns the stall to `available` if it is held by `lock_id`.
    pub fn release(&mut self, lock_id: Uuid) -> bool {
        if !self.is_held_by(lock_id) {
            return false;
        }
        self.status = StallStatus::Available;
        self.lock = None;
        true
    }

    /// Converts a reservation held by `lock_id` into a booking.
    pub fn confirm(&mut self, lock_id: Uuid, booking_id: Uuid) -> bool {
        if !self.is_held_by(lock_id) {
            return false;
        }
        self.status = StallStatus::Booked;
        self.lock = None;
        self.booking_id = Some(booking_id);
        true
    }

    /// Frees the stall if its lock expired at or before `now`.
    pub fn reclaim_expired(&mut self, now: DateTime<Utc>) -> bool {
        let expired = self.status == StallStatus::Reserved
            && self.lock.as_ref().is_some_and(|l| l.is_expired(now));
        if expired {
            self.status = StallStatus::Available;
            self.lock = None;
        }
        expired
    }

    /// Undoes a confirmation made for `booking_id`.
    pub fn revert_booking(&mut self, booking_id: Uuid) -> bool {
        if self.status != StallStatus::Booked || self.booking_id != Some(booking_id) {
            return false;
        }
        self.status = StallStatus::Available;
        self.booking_id = None;
        true
    }

    fn is_held_by(&self, lock_id: Uuid) -> bool {
        self.status == StallStatus::Reserved
            && self.lock.as_ref().is_some_and(|l| l.lock_id == lock_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::requester::Requester;
    use crate::stall::StallShape;

    fn stall() -> Stall {
        Stall::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "A-1",
            dec!(10),
            StallShape::Rectangle {
                width: dec!(10),
                height: dec!(10),
            },
        )
    }

    fn lock(now: DateTime<Utc>, ttl_secs: i64) -> StallLock {
        StallLock::new(
            Uuid::new_v4(),
            &Requester::exhibitor(Uuid::new_v4()),
            now,
            Duration::seconds(ttl_secs),
        )
    }

    #[test]
    fn test_from_parts_rejects_booked_with_lock() {
        let now = Utc::now();
        let s = stall();
        let parts = StallParts {
            id: s.id,
            exhibition_id: s.exhibition_id,
            number: s.number.clone(),
            rate_per_unit: s.rate_per_unit,
            shape: s.shape.clone(),
            status: StallStatus::Booked,
            lock: Some(lock(now, 30)),
            booking_id: None,
        };
        let err = Stall::from_parts(parts).unwrap_err();
        assert_eq!(err.kind, stallhub_core::error::ErrorKind::Integrity);
    }

    #[test]
    fn test_from_parts_rejects_reserved_without_lock() {
        let s = stall();
        let parts = StallParts {
            id: s.id,
            exhibition_id: s.exhibition_id,
            number: s.number,
            rate_per_unit: s.rate_per_unit,
            shape: s.shape,
            status: StallStatus::Reserved,
            lock: None,
            booking_id: None,
        };
        assert!(Stall::from_parts(parts).is_err());
    }

    #[test]
    fn test_lock_then_release_leaves_no_residue() {
        let now = Utc::now();
        let mut s = stall();
        let l = lock(now, 30);
        let lock_id = l.lock_id;

        assert!(s.try_lock(l, now));
        assert_eq!(s.status(), StallStatus::Reserved);
        assert!(!s.try_lock(lock(now, 30), now));

        assert!(s.release(lock_id));
        assert_eq!(s.status(), StallStatus::Available);
        assert!(s.lock().is_none());
        assert!(!s.release(lock_id));
    }

    #[test]
    fn test_expired_lock_can_be_taken_over() {
        let now = Utc::now();
        let mut s = stall();
        let stale = lock(now - Duration::seconds(60), 30);
        let stale_id = stale.lock_id;
        assert!(s.try_lock(stale, now - Duration::seconds(60)));

        let fresh = lock(now, 30);
        let fresh_id = fresh.lock_id;
        assert!(s.try_lock(fresh, now));

        // The old owner can no longer release the new owner's lock.
        assert!(!s.release(stale_id));
        assert_eq!(s.lock().map(|l| l.lock_id), Some(fresh_id));
    }

    #[test]
    fn test_confirm_requires_matching_lock() {
        let now = Utc::now();
        let mut s = stall();
        let l = lock(now, 30);
        let lock_id = l.lock_id;
        s.try_lock(l, now);

        let booking_id = Uuid::new_v4();
        assert!(!s.confirm(Uuid::new_v4(), booking_id));
        assert!(s.confirm(lock_id, booking_id));
        assert_eq!(s.status(), StallStatus::Booked);
        assert!(s.lock().is_none());
        assert_eq!(s.booking_id(), Some(booking_id));
        assert!(!s.is_lockable(now + Duration::days(1)));

        assert!(!s.revert_booking(Uuid::new_v4()));
        assert!(s.revert_booking(booking_id));
        assert_eq!(s.status(), StallStatus::Available);
    }

    #[test]
    fn test_reclaim_only_after_expiry() {
        let now = Utc::now();
        let mut s = stall();
        s.try_lock(lock(now, 30), now);

        assert!(!s.reclaim_expired(now));
        assert!(s.reclaim_expired(now + Duration::seconds(30)));
        assert_eq!(s.status(), StallStatus::Available);
        assert!(s.lock().is_none());
    }
}
