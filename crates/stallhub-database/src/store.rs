//! Storage abstraction for the allocation core.
//!
//! Every write that touches contended state (stall status/lock fields and
//! the sequence counter) is a single conditional operation that re-checks
//! the expected prior state in the same write. Nothing here takes an
//! in-process lock across an await point.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use stallhub_core::result::AppResult;
use stallhub_entity::booking::Booking;
use stallhub_entity::exhibition::Exhibition;
use stallhub_entity::invoice::Invoice;
use stallhub_entity::stall::{Stall, StallLock};

/// How a [`StoreSession`] applies its writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// All writes belong to one transaction, applied by `commit`.
    Transactional,
    /// Every write stands alone and is durable as soon as it returns.
    Autocommit,
}

/// A unit of work against the store.
///
/// The allocation primitives are written once against this trait and run
/// unchanged in both execution modes; only the session handed to them
/// differs.
#[async_trait]
pub trait StoreSession: Send {
    /// Mode this session was opened in.
    fn mode(&self) -> SessionMode;

    /// Conditionally places `lock` on a stall.
    ///
    /// Succeeds only if the stall is `available`, or `reserved` under a lock
    /// that expired at or before `now`. Returns whether the lock was placed.
    async fn lock_stall(
        &mut self,
        stall_id: Uuid,
        lock: &StallLock,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Loads a single stall.
    async fn find_stall(&mut self, stall_id: Uuid) -> AppResult<Option<Stall>>;

    /// Loads the given stalls, in the order requested. Missing ids are skipped.
    async fn find_stalls(&mut self, stall_ids: &[Uuid]) -> AppResult<Vec<Stall>>;

    /// Returns stalls reserved under `lock_id` to `available`.
    ///
    /// Stalls held by any other lock are untouched. Returns the number released.
    async fn release_stalls(&mut self, stall_ids: &[Uuid], lock_id: Uuid) -> AppResult<u64>;

    /// Converts stalls reserved under `lock_id` into `booked` for `booking_id`.
    ///
    /// Returns the number converted.
    async fn confirm_stalls(
        &mut self,
        stall_ids: &[Uuid],
        lock_id: Uuid,
        booking_id: Uuid,
    ) -> AppResult<u64>;

    /// Returns stalls booked by `booking_id` to `available`.
    async fn revert_stalls(&mut self, stall_ids: &[Uuid], booking_id: Uuid) -> AppResult<u64>;

    /// Persists a new booking.
    async fn insert_booking(&mut self, booking: &Booking) -> AppResult<()>;

    /// Persists a new invoice.
    async fn insert_invoice(&mut self, invoice: &Invoice) -> AppResult<()>;

    /// Deletes a booking and its invoice.
    async fn delete_booking(&mut self, booking_id: Uuid) -> AppResult<()>;

    /// Makes all writes durable. No-op in autocommit mode.
    async fn commit(&mut self) -> AppResult<()>;

    /// Discards all writes. No-op in autocommit mode.
    async fn rollback(&mut self) -> AppResult<()>;
}

/// A backend able to host the allocation core.
#[async_trait]
pub trait BookingStore: Send + Sync + std::fmt::Debug {
    /// Whether multi-statement transactions are available right now.
    async fn supports_transactions(&self) -> AppResult<bool>;

    /// Opens a session in the given mode.
    async fn session(&self, mode: SessionMode) -> AppResult<Box<dyn StoreSession>>;

    /// Loads an exhibition with its discount and tax configuration.
    async fn find_exhibition(&self, exhibition_id: Uuid) -> AppResult<Option<Exhibition>>;

    /// Loads a stall outside any session.
    async fn find_stall(&self, stall_id: Uuid) -> AppResult<Option<Stall>>;

    /// Loads a booking.
    async fn find_booking(&self, booking_id: Uuid) -> AppResult<Option<Booking>>;

    /// Loads the invoice issued for a booking.
    async fn find_invoice_for_booking(&self, booking_id: Uuid) -> AppResult<Option<Invoice>>;

    /// Atomically increments the `(name, year)` counter, creating it at 1,
    /// and returns the new value. Always a standalone write.
    async fn increment_sequence(&self, name: &str, year: i32) -> AppResult<i64>;

    /// Returns every stall whose lock expired at or before `now` to
    /// `available`. Returns the number reclaimed.
    async fn release_expired_locks(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
