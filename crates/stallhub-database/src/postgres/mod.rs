//! PostgreSQL implementation of the booking store.

mod rows;
mod session;
mod store;

use stallhub_core::error::{AppError, ErrorKind};

pub use session::PgSession;
pub use store::PgBookingStore;

/// Columns selected for every stall query.
const STALL_COLUMNS: &str = "id, exhibition_id, number, rate_per_unit, shape, status, \
     lock_id, locked_by, lock_role, lock_expires_at, booking_id";

/// Wraps a sqlx failure as a database error with context.
fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, format!("{context}: {e}"), e)
}

/// Whether `err` means the row was held by a concurrent transaction:
/// deadlock detected (40P01) or lock not available (55P03).
fn is_lock_contention(err: &sqlx::Error) -> bool {
    matches!(
        err.as_database_error().and_then(|e| e.code()).as_deref(),
        Some("40P01" | "55P03")
    )
}
