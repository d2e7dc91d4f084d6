//! [`BookingStore`] over a PostgreSQL pool.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use stallhub_core::error::AppError;
use stallhub_core::result::AppResult;
use stallhub_entity::booking::Booking;
use stallhub_entity::exhibition::Exhibition;
use stallhub_entity::invoice::Invoice;
use stallhub_entity::stall::Stall;

use super::rows::{BookingRow, ExhibitionRow, StallRow};
use super::session::PgSession;
use super::{STALL_COLUMNS, db_err};
use crate::store::{BookingStore, SessionMode, StoreSession};

/// PostgreSQL-backed store.
///
/// An allocation holds its session connection while it mints the invoice
/// number on a second one. Open sessions are therefore capped one below the
/// pool size, which keeps a connection free for the sequence counter.
#[derive(Debug, Clone)]
pub struct PgBookingStore {
    pool: PgPool,
    transactions_enabled: bool,
    sessions: Arc<Semaphore>,
}

impl PgBookingStore {
    /// Creates a store over `pool`.
    ///
    /// With `transactions_enabled = false` the store reports no transaction
    /// support, which puts every allocation in compensation mode.
    pub fn new(pool: PgPool, transactions_enabled: bool) -> Self {
        let max_connections = pool.options().get_max_connections();
        if max_connections < 2 {
            warn!(
                max_connections,
                "Pool too small to keep a connection free for invoice numbering"
            );
        }
        let capacity = max_connections.saturating_sub(1).max(1) as usize;
        Self {
            pool,
            transactions_enabled,
            sessions: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Sessions that can be open at once.
    pub fn session_capacity(&self) -> usize {
        self.sessions.available_permits()
    }

    async fn session_permit(&self) -> AppResult<OwnedSemaphorePermit> {
        Arc::clone(&self.sessions)
            .acquire_owned()
            .await
            .map_err(|_| AppError::service_unavailable("Store session gate closed"))
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn supports_transactions(&self) -> AppResult<bool> {
        if !self.transactions_enabled {
            return Ok(false);
        }
        // A begin that fails here means the connection cannot host a
        // multi-statement transaction right now.
        let tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to probe transaction support"))?;
        tx.rollback()
            .await
            .map_err(db_err("Failed to end transaction probe"))?;
        Ok(true)
    }

    async fn session(&self, mode: SessionMode) -> AppResult<Box<dyn StoreSession>> {
        let permit = self.session_permit().await?;
        let session = match mode {
            SessionMode::Transactional => {
                let tx = self
                    .pool
                    .begin()
                    .await
                    .map_err(db_err("Failed to begin transaction"))?;
                PgSession::transactional(tx, permit)
            }
            SessionMode::Autocommit => {
                let conn = self
                    .pool
                    .acquire()
                    .await
                    .map_err(db_err("Failed to acquire connection"))?;
                PgSession::autocommit(conn, permit)
            }
        };
        Ok(Box::new(session))
    }

    async fn find_exhibition(&self, exhibition_id: Uuid) -> AppResult<Option<Exhibition>> {
        let row = sqlx::query_as::<_, ExhibitionRow>(
            "SELECT id, name, status, is_active, invoice_prefix, discounts, public_discounts, taxes \
             FROM exhibitions WHERE id = $1",
        )
        .bind(exhibition_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to load exhibition"))?;
        Ok(row.map(Exhibition::from))
    }

    async fn find_stall(&self, stall_id: Uuid) -> AppResult<Option<Stall>> {
        let row = sqlx::query_as::<_, StallRow>(&format!(
            "SELECT {STALL_COLUMNS} FROM stalls WHERE id = $1"
        ))
        .bind(stall_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to load stall"))?;
        row.map(Stall::try_from).transpose()
    }

    async fn find_booking(&self, booking_id: Uuid) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, exhibition_id, stall_ids, requester_id, requester_role, source, status, \
             payment_status, discount_id, billing, pricing, created_at \
             FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to load booking"))?;
        Ok(row.map(Booking::from))
    }

    async fn find_invoice_for_booking(&self, booking_id: Uuid) -> AppResult<Option<Invoice>> {
        sqlx::query_as::<_, Invoice>(
            "SELECT id, booking_id, exhibition_id, invoice_number, sequence, sequence_year, \
             numbering, amount, status, issued_at FROM invoices WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to load invoice"))
    }

    async fn increment_sequence(&self, name: &str, year: i32) -> AppResult<i64> {
        let value = sqlx::query_scalar::<_, i64>(
            "INSERT INTO sequence_counters (name, year, value) VALUES ($1, $2, 1) \
             ON CONFLICT (name, year) \
             DO UPDATE SET value = sequence_counters.value + 1, updated_at = NOW() \
             RETURNING value",
        )
        .bind(name)
        .bind(year)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to increment sequence"))?;

        debug!(name = %name, year, value, "Sequence incremented");
        Ok(value)
    }

    async fn release_expired_locks(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE stalls SET status = 'available', lock_id = NULL, locked_by = NULL, \
             lock_role = NULL, lock_expires_at = NULL, updated_at = NOW() \
             WHERE status = 'reserved' AND lock_expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to release expired locks"))?;

        let released = result.rows_affected();
        if released > 0 {
            info!(released, "Released expired stall locks");
        }
        Ok(released)
    }
}
