//! [`StoreSession`] over a single PostgreSQL connection or transaction.

use std::collections::HashMap;
use std::mem;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::types::Json;
use sqlx::{PgConnection, Postgres, Transaction};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, warn};
use uuid::Uuid;

use stallhub_core::error::AppError;
use stallhub_core::result::AppResult;
use stallhub_entity::booking::Booking;
use stallhub_entity::invoice::Invoice;
use stallhub_entity::stall::{Stall, StallLock};

use super::rows::StallRow;
use super::{STALL_COLUMNS, db_err, is_lock_contention};
use crate::store::{SessionMode, StoreSession};

enum Connection {
    Pooled(PoolConnection<Postgres>),
    Transaction(Transaction<'static, Postgres>),
    Closed,
}

/// A session bound to one pooled connection.
///
/// In transactional mode an uncommitted session rolls back when dropped.
/// The session permit is returned together with the connection.
pub struct PgSession {
    mode: SessionMode,
    conn: Connection,
    _permit: OwnedSemaphorePermit,
}

impl PgSession {
    pub(super) fn transactional(
        tx: Transaction<'static, Postgres>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            mode: SessionMode::Transactional,
            conn: Connection::Transaction(tx),
            _permit: permit,
        }
    }

    pub(super) fn autocommit(conn: PoolConnection<Postgres>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            mode: SessionMode::Autocommit,
            conn: Connection::Pooled(conn),
            _permit: permit,
        }
    }

    fn conn(&mut self) -> AppResult<&mut PgConnection> {
        match &mut self.conn {
            Connection::Pooled(c) => Ok(&mut **c),
            Connection::Transaction(tx) => Ok(&mut **tx),
            Connection::Closed => Err(AppError::internal("Store session already closed")),
        }
    }
}

#[async_trait]
impl StoreSession for PgSession {
    fn mode(&self) -> SessionMode {
        self.mode
    }

    async fn lock_stall(
        &mut self,
        stall_id: Uuid,
        lock: &StallLock,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        // A row held by another open transaction is skipped rather than
        // waited on, so overlapping requests never block on each other.
        let result = sqlx::query(
            "UPDATE stalls SET status = 'reserved', lock_id = $2, locked_by = $3, \
             lock_role = $4, lock_expires_at = $5, updated_at = NOW() \
             WHERE id = (SELECT id FROM stalls WHERE id = $1 AND (status = 'available' \
                OR (status = 'reserved' AND lock_expires_at <= $6)) \
                FOR UPDATE SKIP LOCKED)",
        )
        .bind(stall_id)
        .bind(lock.lock_id)
        .bind(lock.owner_id)
        .bind(lock.role)
        .bind(lock.expires_at)
        .bind(now)
        .execute(self.conn()?)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            Err(e) if is_lock_contention(&e) => {
                debug!(stall_id = %stall_id, error = %e, "Stall row contended");
                Ok(false)
            }
            Err(e) => Err(db_err("Failed to lock stall")(e)),
        }
    }

    async fn find_stall(&mut self, stall_id: Uuid) -> AppResult<Option<Stall>> {
        let row = sqlx::query_as::<_, StallRow>(&format!(
            "SELECT {STALL_COLUMNS} FROM stalls WHERE id = $1"
        ))
        .bind(stall_id)
        .fetch_optional(self.conn()?)
        .await
        .map_err(db_err("Failed to load stall"))?;
        row.map(Stall::try_from).transpose()
    }

    async fn find_stalls(&mut self, stall_ids: &[Uuid]) -> AppResult<Vec<Stall>> {
        let rows = sqlx::query_as::<_, StallRow>(&format!(
            "SELECT {STALL_COLUMNS} FROM stalls WHERE id = ANY($1)"
        ))
        .bind(stall_ids)
        .fetch_all(self.conn()?)
        .await
        .map_err(db_err("Failed to load stalls"))?;

        let mut by_id = rows
            .into_iter()
            .map(|row| Stall::try_from(row).map(|s| (s.id, s)))
            .collect::<AppResult<HashMap<_, _>>>()?;
        Ok(stall_ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn release_stalls(&mut self, stall_ids: &[Uuid], lock_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE stalls SET status = 'available', lock_id = NULL, locked_by = NULL, \
             lock_role = NULL, lock_expires_at = NULL, updated_at = NOW() \
             WHERE id = ANY($1) AND status = 'reserved' AND lock_id = $2",
        )
        .bind(stall_ids)
        .bind(lock_id)
        .execute(self.conn()?)
        .await
        .map_err(db_err("Failed to release stalls"))?;
        Ok(result.rows_affected())
    }

    async fn confirm_stalls(
        &mut self,
        stall_ids: &[Uuid],
        lock_id: Uuid,
        booking_id: Uuid,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE stalls SET status = 'booked', booking_id = $3, lock_id = NULL, \
             locked_by = NULL, lock_role = NULL, lock_expires_at = NULL, updated_at = NOW() \
             WHERE id = ANY($1) AND status = 'reserved' AND lock_id = $2",
        )
        .bind(stall_ids)
        .bind(lock_id)
        .bind(booking_id)
        .execute(self.conn()?)
        .await
        .map_err(db_err("Failed to confirm stalls"))?;
        Ok(result.rows_affected())
    }

    async fn revert_stalls(&mut self, stall_ids: &[Uuid], booking_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE stalls SET status = 'available', booking_id = NULL, updated_at = NOW() \
             WHERE id = ANY($1) AND status = 'booked' AND booking_id = $2",
        )
        .bind(stall_ids)
        .bind(booking_id)
        .execute(self.conn()?)
        .await
        .map_err(db_err("Failed to revert stalls"))?;
        Ok(result.rows_affected())
    }

    async fn insert_booking(&mut self, booking: &Booking) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO bookings (id, exhibition_id, stall_ids, requester_id, requester_role, \
             source, status, payment_status, discount_id, billing, pricing, total_amount, \
             created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(booking.id)
        .bind(booking.exhibition_id)
        .bind(&booking.stall_ids)
        .bind(booking.requester_id)
        .bind(booking.requester_role)
        .bind(booking.source)
        .bind(booking.status)
        .bind(booking.payment_status)
        .bind(&booking.discount_id)
        .bind(Json(&booking.billing))
        .bind(Json(&booking.pricing))
        .bind(booking.total_amount())
        .bind(booking.created_at)
        .execute(self.conn()?)
        .await
        .map_err(db_err("Failed to insert booking"))?;
        Ok(())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO invoices (id, booking_id, exhibition_id, invoice_number, sequence, \
             sequence_year, numbering, amount, status, issued_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(invoice.id)
        .bind(invoice.booking_id)
        .bind(invoice.exhibition_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.sequence)
        .bind(invoice.sequence_year)
        .bind(invoice.numbering)
        .bind(invoice.amount)
        .bind(invoice.status)
        .bind(invoice.issued_at)
        .execute(self.conn()?)
        .await
        .map_err(db_err("Failed to insert invoice"))?;
        Ok(())
    }

    async fn delete_booking(&mut self, booking_id: Uuid) -> AppResult<()> {
        // Invoices cascade with their booking.
        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(self.conn()?)
            .await
            .map_err(db_err("Failed to delete booking"))?;
        Ok(())
    }

    async fn commit(&mut self) -> AppResult<()> {
        match mem::replace(&mut self.conn, Connection::Closed) {
            Connection::Transaction(tx) => tx
                .commit()
                .await
                .map_err(db_err("Failed to commit transaction")),
            other => {
                self.conn = other;
                Ok(())
            }
        }
    }

    async fn rollback(&mut self) -> AppResult<()> {
        match mem::replace(&mut self.conn, Connection::Closed) {
            Connection::Transaction(tx) => tx
                .rollback()
                .await
                .map_err(db_err("Failed to roll back transaction")),
            other => {
                if matches!(other, Connection::Closed) {
                    warn!("Rollback on a closed store session");
                }
                self.conn = other;
                Ok(())
            }
        }
    }
}
