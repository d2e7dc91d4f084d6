use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use stallhub_core::error::AppError;
use stallhub_core::result::AppResult;
use stallhub_entity::booking::Booking;
use stallhub_entity::invoice::Invoice;
use stallhub_entity::stall::{Stall, StallLock};

use super::store::{MemoryStore, StoreOp};
use crate::store::{SessionMode, StoreSession};

/// One journal entry, undoing a single write.
enum Undo {
    /// Restore `before` if the stall still looks like `after`.
    Stall { before: Stall, after: Stall },
    RemoveBooking(Uuid),
    RemoveInvoice(Uuid),
    RestoreBooking(Booking),
    RestoreInvoice(Invoice),
}

/// A session over a [`MemoryStore`].
///
/// Writes land immediately. In transactional mode each one is journaled,
/// and the journal is replayed in reverse on rollback or on drop without
/// commit. A stall is only restored if nobody changed it since.
pub struct MemorySession {
    store: MemoryStore,
    mode: SessionMode,
    journal: Vec<Undo>,
    finished: bool,
}

impl MemorySession {
    pub(super) fn new(store: MemoryStore, mode: SessionMode) -> Self {
        Self {
            store,
            mode,
            journal: Vec::new(),
            finished: false,
        }
    }

    fn record(&mut self, undo: Undo) {
        if self.mode == SessionMode::Transactional {
            self.journal.push(undo);
        }
    }

    /// Applies `change` to a stall under its shard guard. Journals and
    /// returns `true` only if `change` reported a modification.
    fn mutate_stall<F>(&mut self, stall_id: Uuid, change: F) -> bool
    where
        F: FnOnce(&mut Stall) -> bool,
    {
        let undo = {
            let Some(mut stall) = self.store.state.stalls.get_mut(&stall_id) else {
                return false;
            };
            let before = stall.clone();
            if !change(&mut *stall) {
                return false;
            }
            Undo::Stall {
                before,
                after: stall.clone(),
            }
        };
        self.record(undo);
        true
    }

    fn mutate_stalls<F>(&mut self, stall_ids: &[Uuid], change: F) -> u64
    where
        F: Fn(&mut Stall) -> bool,
    {
        stall_ids
            .iter()
            .filter(|id| self.mutate_stall(**id, &change))
            .count() as u64
    }

    fn undo_all(&mut self) {
        let state = &self.store.state;
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::Stall { before, after } => {
                    if let Some(mut current) = state.stalls.get_mut(&before.id) {
                        if *current == after {
                            *current = before;
                        } else {
                            warn!(stall_id = %before.id, "Stall changed since write, not rolled back");
                        }
                    }
                }
                Undo::RemoveBooking(id) => {
                    state.bookings.remove(&id);
                }
                Undo::RemoveInvoice(booking_id) => {
                    state.invoices.remove(&booking_id);
                }
                Undo::RestoreBooking(booking) => {
                    state.bookings.insert(booking.id, booking);
                }
                Undo::RestoreInvoice(invoice) => {
                    state.invoices.insert(invoice.booking_id, invoice);
                }
            }
        }
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    fn mode(&self) -> SessionMode {
        self.mode
    }

    async fn lock_stall(
        &mut self,
        stall_id: Uuid,
        lock: &StallLock,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.store.enter(StoreOp::LockStall)?;
        Ok(self.mutate_stall(stall_id, |s| s.try_lock(lock.clone(), now)))
    }

    async fn find_stall(&mut self, stall_id: Uuid) -> AppResult<Option<Stall>> {
        self.store.enter(StoreOp::FindStall)?;
        Ok(self.store.stall(stall_id))
    }

    async fn find_stalls(&mut self, stall_ids: &[Uuid]) -> AppResult<Vec<Stall>> {
        self.store.enter(StoreOp::FindStalls)?;
        Ok(stall_ids
            .iter()
            .filter_map(|id| self.store.stall(*id))
            .collect())
    }

    async fn release_stalls(&mut self, stall_ids: &[Uuid], lock_id: Uuid) -> AppResult<u64> {
        self.store.enter(StoreOp::ReleaseStalls)?;
        Ok(self.mutate_stalls(stall_ids, |s| s.release(lock_id)))
    }

    async fn confirm_stalls(
        &mut self,
        stall_ids: &[Uuid],
        lock_id: Uuid,
        booking_id: Uuid,
    ) -> AppResult<u64> {
        self.store.enter(StoreOp::ConfirmStalls)?;
        Ok(self.mutate_stalls(stall_ids, |s| s.confirm(lock_id, booking_id)))
    }

    async fn revert_stalls(&mut self, stall_ids: &[Uuid], booking_id: Uuid) -> AppResult<u64> {
        self.store.enter(StoreOp::RevertStalls)?;
        Ok(self.mutate_stalls(stall_ids, |s| s.revert_booking(booking_id)))
    }

    async fn insert_booking(&mut self, booking: &Booking) -> AppResult<()> {
        self.store.enter(StoreOp::InsertBooking)?;
        if self.store.state.bookings.contains_key(&booking.id) {
            return Err(AppError::conflict(format!(
                "Booking {} already exists",
                booking.id
            )));
        }
        self.store.state.bookings.insert(booking.id, booking.clone());
        self.record(Undo::RemoveBooking(booking.id));
        Ok(())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> AppResult<()> {
        self.store.enter(StoreOp::InsertInvoice)?;
        if self.store.state.invoices.contains_key(&invoice.booking_id) {
            return Err(AppError::conflict(format!(
                "Booking {} already has an invoice",
                invoice.booking_id
            )));
        }
        self.store
            .state
            .invoices
            .insert(invoice.booking_id, invoice.clone());
        self.record(Undo::RemoveInvoice(invoice.booking_id));
        Ok(())
    }

    async fn delete_booking(&mut self, booking_id: Uuid) -> AppResult<()> {
        self.store.enter(StoreOp::DeleteBooking)?;
        if let Some((_, invoice)) = self.store.state.invoices.remove(&booking_id) {
            self.record(Undo::RestoreInvoice(invoice));
        }
        if let Some((_, booking)) = self.store.state.bookings.remove(&booking_id) {
            self.record(Undo::RestoreBooking(booking));
        }
        Ok(())
    }

    async fn commit(&mut self) -> AppResult<()> {
        self.store.enter(StoreOp::Commit)?;
        self.journal.clear();
        self.finished = true;
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        self.undo_all();
        self.finished = true;
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if !self.finished && !self.journal.is_empty() {
            warn!(
                writes = self.journal.len(),
                "Store session dropped without commit, rolling back"
            );
            self.undo_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use stallhub_entity::requester::Requester;
    use stallhub_entity::stall::{StallShape, StallStatus};

    use super::*;
    use crate::store::BookingStore;

    fn seeded() -> (MemoryStore, Vec<Uuid>) {
        let store = MemoryStore::new();
        let exhibition_id = Uuid::new_v4();
        let ids = (0..3)
            .map(|i| {
                let stall = Stall::new(
                    Uuid::new_v4(),
                    exhibition_id,
                    format!("C-{i}"),
                    dec!(10),
                    StallShape::Rectangle {
                        width: dec!(2),
                        height: dec!(2),
                    },
                );
                let id = stall.id;
                store.insert_stall(stall);
                id
            })
            .collect();
        (store, ids)
    }

    fn lock() -> StallLock {
        StallLock::new(
            Uuid::new_v4(),
            &Requester::operator(Uuid::new_v4()),
            Utc::now(),
            Duration::seconds(30),
        )
    }

    #[tokio::test]
    async fn test_rollback_restores_stalls() {
        let (store, ids) = seeded();
        let lock = lock();
        let now = Utc::now();

        let mut session = store.session(SessionMode::Transactional).await.unwrap();
        for id in &ids {
            assert!(session.lock_stall(*id, &lock, now).await.unwrap());
        }
        assert_eq!(store.stall(ids[0]).unwrap().status(), StallStatus::Reserved);

        session.rollback().await.unwrap();
        for id in &ids {
            assert_eq!(store.stall(*id).unwrap().status(), StallStatus::Available);
        }
    }

    #[tokio::test]
    async fn test_drop_without_commit_rolls_back() {
        let (store, ids) = seeded();
        let lock = lock();
        {
            let mut session = store.session(SessionMode::Transactional).await.unwrap();
            session.lock_stall(ids[1], &lock, Utc::now()).await.unwrap();
        }
        assert_eq!(store.stall(ids[1]).unwrap().status(), StallStatus::Available);
    }

    #[tokio::test]
    async fn test_autocommit_rollback_is_noop() {
        let (store, ids) = seeded();
        let lock = lock();

        let mut session = store.session(SessionMode::Autocommit).await.unwrap();
        session.lock_stall(ids[0], &lock, Utc::now()).await.unwrap();
        session.rollback().await.unwrap();
        drop(session);

        assert_eq!(store.stall(ids[0]).unwrap().status(), StallStatus::Reserved);
    }

    #[tokio::test]
    async fn test_find_stalls_keeps_request_order() {
        let (store, ids) = seeded();
        let mut session = store.session(SessionMode::Autocommit).await.unwrap();

        let order = vec![ids[2], Uuid::new_v4(), ids[0]];
        let found = session.find_stalls(&order).await.unwrap();
        assert_eq!(
            found.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![ids[2], ids[0]]
        );
    }

    #[tokio::test]
    async fn test_release_ignores_foreign_lock() {
        let (store, ids) = seeded();
        let mine = lock();
        let theirs = lock();
        let now = Utc::now();

        let mut session = store.session(SessionMode::Autocommit).await.unwrap();
        session.lock_stall(ids[0], &mine, now).await.unwrap();
        session.lock_stall(ids[1], &theirs, now).await.unwrap();

        let released = session.release_stalls(&ids, mine.lock_id).await.unwrap();
        assert_eq!(released, 1);
        assert_eq!(store.stall(ids[1]).unwrap().status(), StallStatus::Reserved);
    }

    #[tokio::test]
    async fn test_rollback_skips_stall_changed_by_others() {
        let (store, ids) = seeded();
        let mine = lock();
        let now = Utc::now();

        let mut session = store.session(SessionMode::Transactional).await.unwrap();
        session.lock_stall(ids[0], &mine, now).await.unwrap();

        // Someone else frees and re-locks the stall in the meantime.
        let mut other = store.stall(ids[0]).unwrap();
        other.release(mine.lock_id);
        let theirs = lock();
        other.try_lock(theirs.clone(), now);
        store.insert_stall(other);

        session.rollback().await.unwrap();
        let stall = store.stall(ids[0]).unwrap();
        assert_eq!(stall.lock().map(|l| l.lock_id), Some(theirs.lock_id));
    }
}
