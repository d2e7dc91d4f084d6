use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use stallhub_core::error::AppError;
use stallhub_core::result::AppResult;
use stallhub_entity::booking::Booking;
use stallhub_entity::exhibition::Exhibition;
use stallhub_entity::invoice::Invoice;
use stallhub_entity::stall::Stall;

use super::session::MemorySession;
use crate::store::{BookingStore, SessionMode, StoreSession};

/// Store operations that can carry an injected fault or a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `BookingStore::supports_transactions`.
    ProbeTransactions,
    /// `BookingStore::session`.
    OpenSession,
    /// `BookingStore::find_exhibition`.
    FindExhibition,
    /// `StoreSession::lock_stall`.
    LockStall,
    /// `StoreSession::find_stall`.
    FindStall,
    /// `StoreSession::find_stalls`.
    FindStalls,
    /// `StoreSession::release_stalls`.
    ReleaseStalls,
    /// `StoreSession::confirm_stalls`.
    ConfirmStalls,
    /// `StoreSession::revert_stalls`.
    RevertStalls,
    /// `StoreSession::insert_booking`.
    InsertBooking,
    /// `StoreSession::insert_invoice`.
    InsertInvoice,
    /// `StoreSession::delete_booking`.
    DeleteBooking,
    /// `StoreSession::commit`.
    Commit,
    /// `BookingStore::increment_sequence`.
    IncrementSequence,
    /// `BookingStore::release_expired_locks`.
    ReleaseExpired,
}

type Hook = Arc<dyn Fn(&MemoryStore) + Send + Sync>;

pub(super) struct MemoryState {
    pub(super) exhibitions: DashMap<Uuid, Exhibition>,
    pub(super) stalls: DashMap<Uuid, Stall>,
    pub(super) bookings: DashMap<Uuid, Booking>,
    /// Keyed by booking id; one invoice per booking.
    pub(super) invoices: DashMap<Uuid, Invoice>,
    counters: DashMap<(String, i32), i64>,
    transactions: AtomicBool,
    faults: DashMap<StoreOp, u32>,
    hooks: DashMap<StoreOp, Hook>,
}

/// In-memory [`BookingStore`].
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct MemoryStore {
    pub(super) state: Arc<MemoryState>,
}

impl MemoryStore {
    /// Creates an empty store that supports transactions.
    pub fn new() -> Self {
        Self::with_transactions(true)
    }

    /// Creates an empty store that reports no transaction support, forcing
    /// callers into compensation mode.
    pub fn without_transactions() -> Self {
        Self::with_transactions(false)
    }

    fn with_transactions(enabled: bool) -> Self {
        Self {
            state: Arc::new(MemoryState {
                exhibitions: DashMap::new(),
                stalls: DashMap::new(),
                bookings: DashMap::new(),
                invoices: DashMap::new(),
                counters: DashMap::new(),
                transactions: AtomicBool::new(enabled),
                faults: DashMap::new(),
                hooks: DashMap::new(),
            }),
        }
    }

    /// Switches transaction support on or off.
    pub fn set_transactions(&self, enabled: bool) {
        self.state.transactions.store(enabled, Ordering::SeqCst);
    }

    /// Adds or replaces an exhibition.
    pub fn insert_exhibition(&self, exhibition: Exhibition) {
        self.state.exhibitions.insert(exhibition.id, exhibition);
    }

    /// Adds or replaces a stall.
    pub fn insert_stall(&self, stall: Stall) {
        self.state.stalls.insert(stall.id, stall);
    }

    /// Snapshot of a stall.
    pub fn stall(&self, stall_id: Uuid) -> Option<Stall> {
        self.state.stalls.get(&stall_id).map(|s| s.clone())
    }

    /// Snapshot of every stored booking.
    pub fn bookings(&self) -> Vec<Booking> {
        self.state.bookings.iter().map(|b| b.clone()).collect()
    }

    /// Snapshot of every stored invoice.
    pub fn invoices(&self) -> Vec<Invoice> {
        self.state.invoices.iter().map(|i| i.clone()).collect()
    }

    /// Current value of a sequence counter, if it was ever incremented.
    pub fn sequence_value(&self, name: &str, year: i32) -> Option<i64> {
        self.state
            .counters
            .get(&(name.to_string(), year))
            .map(|v| *v)
    }

    /// Frees every stall whose lock expired at or before `now`.
    ///
    /// Synchronous twin of [`BookingStore::release_expired_locks`] for use
    /// inside hooks. Ignores injected faults.
    pub fn reclaim_expired_at(&self, now: DateTime<Utc>) -> u64 {
        let mut released = 0;
        for mut stall in self.state.stalls.iter_mut() {
            if stall.reclaim_expired(now) {
                released += 1;
            }
        }
        released
    }

    /// Makes the next call to `op` fail with a database error.
    pub fn inject_fault(&self, op: StoreOp) {
        self.inject_faults(op, 1);
    }

    /// Makes the next `count` calls to `op` fail with a database error.
    pub fn inject_faults(&self, op: StoreOp, count: u32) {
        *self.state.faults.entry(op).or_insert(0) += count;
    }

    /// Runs `hook` every time `op` is about to execute, before any injected
    /// fault is checked.
    pub fn before<F>(&self, op: StoreOp, hook: F)
    where
        F: Fn(&MemoryStore) + Send + Sync + 'static,
    {
        self.state.hooks.insert(op, Arc::new(hook));
    }

    /// Removes the hook registered for `op`.
    pub fn clear_hook(&self, op: StoreOp) {
        self.state.hooks.remove(&op);
    }

    /// Runs the hook for `op`, then fails if a fault is pending for it.
    pub(super) fn enter(&self, op: StoreOp) -> AppResult<()> {
        // Clone out of the map so the hook may touch the store freely.
        let hook = self.state.hooks.get(&op).map(|h| h.value().clone());
        if let Some(hook) = hook {
            hook(self);
        }

        if let Some(mut pending) = self.state.faults.get_mut(&op) {
            if *pending > 0 {
                *pending -= 1;
                debug!(op = ?op, "Injected store fault");
                return Err(AppError::database(format!("Injected fault on {op:?}")));
            }
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("exhibitions", &self.state.exhibitions.len())
            .field("stalls", &self.state.stalls.len())
            .field("bookings", &self.state.bookings.len())
            .field(
                "transactions",
                &self.state.transactions.load(Ordering::SeqCst),
            )
            .finish()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn supports_transactions(&self) -> AppResult<bool> {
        self.enter(StoreOp::ProbeTransactions)?;
        Ok(self.state.transactions.load(Ordering::SeqCst))
    }

    async fn session(&self, mode: SessionMode) -> AppResult<Box<dyn StoreSession>> {
        self.enter(StoreOp::OpenSession)?;
        Ok(Box::new(MemorySession::new(self.clone(), mode)))
    }

    async fn find_exhibition(&self, exhibition_id: Uuid) -> AppResult<Option<Exhibition>> {
        self.enter(StoreOp::FindExhibition)?;
        Ok(self.state.exhibitions.get(&exhibition_id).map(|e| e.clone()))
    }

    async fn find_stall(&self, stall_id: Uuid) -> AppResult<Option<Stall>> {
        self.enter(StoreOp::FindStall)?;
        Ok(self.stall(stall_id))
    }

    async fn find_booking(&self, booking_id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self.state.bookings.get(&booking_id).map(|b| b.clone()))
    }

    async fn find_invoice_for_booking(&self, booking_id: Uuid) -> AppResult<Option<Invoice>> {
        Ok(self.state.invoices.get(&booking_id).map(|i| i.clone()))
    }

    async fn increment_sequence(&self, name: &str, year: i32) -> AppResult<i64> {
        self.enter(StoreOp::IncrementSequence)?;
        let mut value = self
            .state
            .counters
            .entry((name.to_string(), year))
            .or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn release_expired_locks(&self, now: DateTime<Utc>) -> AppResult<u64> {
        self.enter(StoreOp::ReleaseExpired)?;
        let released = self.reclaim_expired_at(now);
        if released > 0 {
            info!(released, "Released expired stall locks");
        }
        Ok(released)
    }
}
