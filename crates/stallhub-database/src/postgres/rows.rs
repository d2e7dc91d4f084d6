//! Row types bridging PostgreSQL columns and domain entities.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use stallhub_core::error::AppError;
use stallhub_entity::booking::{
    BillingDetails, Booking, BookingSource, BookingStatus, PaymentStatus, PriceBreakdown,
};
use stallhub_entity::exhibition::{Discount, Exhibition, ExhibitionStatus, TaxRate};
use stallhub_entity::requester::RequesterRole;
use stallhub_entity::stall::{Stall, StallLock, StallParts, StallShape, StallStatus};

/// A `stalls` row. Lock columns are flattened and nullable.
#[derive(Debug, FromRow)]
pub(super) struct StallRow {
    pub id: Uuid,
    pub exhibition_id: Uuid,
    pub number: String,
    pub rate_per_unit: Decimal,
    pub shape: Json<StallShape>,
    pub status: StallStatus,
    pub lock_id: Option<Uuid>,
    pub locked_by: Option<Uuid>,
    pub lock_role: Option<RequesterRole>,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub booking_id: Option<Uuid>,
}

impl TryFrom<StallRow> for Stall {
    type Error = AppError;

    fn try_from(row: StallRow) -> Result<Self, Self::Error> {
        let lock = match (row.lock_id, row.locked_by, row.lock_role, row.lock_expires_at) {
            (Some(lock_id), Some(owner_id), Some(role), Some(expires_at)) => Some(StallLock {
                lock_id,
                owner_id,
                role,
                expires_at,
            }),
            (None, None, None, None) => None,
            _ => {
                return Err(AppError::integrity(format!(
                    "Stall {} has a partial lock descriptor",
                    row.id
                )));
            }
        };

        Stall::from_parts(StallParts {
            id: row.id,
            exhibition_id: row.exhibition_id,
            number: row.number,
            rate_per_unit: row.rate_per_unit,
            shape: row.shape.0,
            status: row.status,
            lock,
            booking_id: row.booking_id,
        })
    }
}

/// An `exhibitions` row with its JSONB configuration columns.
#[derive(Debug, FromRow)]
pub(super) struct ExhibitionRow {
    pub id: Uuid,
    pub name: String,
    pub status: ExhibitionStatus,
    pub is_active: bool,
    pub invoice_prefix: String,
    pub discounts: Json<Vec<Discount>>,
    pub public_discounts: Json<Vec<Discount>>,
    pub taxes: Json<Vec<TaxRate>>,
}

impl From<ExhibitionRow> for Exhibition {
    fn from(row: ExhibitionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            status: row.status,
            is_active: row.is_active,
            invoice_prefix: row.invoice_prefix,
            discounts: row.discounts.0,
            public_discounts: row.public_discounts.0,
            taxes: row.taxes.0,
        }
    }
}

/// A `bookings` row.
#[derive(Debug, FromRow)]
pub(super) struct BookingRow {
    pub id: Uuid,
    pub exhibition_id: Uuid,
    pub stall_ids: Vec<Uuid>,
    pub requester_id: Uuid,
    pub requester_role: RequesterRole,
    pub source: BookingSource,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub discount_id: Option<String>,
    pub billing: Json<BillingDetails>,
    pub pricing: Json<PriceBreakdown>,
    pub created_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Self {
            id: row.id,
            exhibition_id: row.exhibition_id,
            stall_ids: row.stall_ids,
            requester_id: row.requester_id,
            requester_role: row.requester_role,
            source: row.source,
            status: row.status,
            payment_status: row.payment_status,
            discount_id: row.discount_id,
            billing: row.billing.0,
            pricing: row.pricing.0,
            created_at: row.created_at,
        }
    }
}
