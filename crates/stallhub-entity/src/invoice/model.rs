//! Invoice entity model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Issued, awaiting payment.
    Pending,
    /// Fully paid.
    Paid,
    /// Voided.
    Cancelled,
}

/// Where the invoice sequence number came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_numbering", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceNumbering {
    /// Minted by the sequence counter; unique within prefix and year.
    Sequential,
    /// Timestamp-derived because the counter was unreachable; may collide.
    Provisional,
}

/// The invoice issued for a booking. One-to-one with [`Booking`].
///
/// [`Booking`]: crate::booking::Booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    /// Unique invoice identifier.
    pub id: Uuid,
    /// The booking this invoice bills.
    pub booking_id: Uuid,
    /// Exhibition the booking belongs to.
    pub exhibition_id: Uuid,
    /// Rendered number, `{PREFIX}-{YEAR}-{SEQ:05}`.
    pub invoice_number: String,
    /// Raw sequence value.
    pub sequence: i64,
    /// Year the sequence belongs to.
    pub sequence_year: i32,
    /// Whether `sequence` is guaranteed unique.
    pub numbering: InvoiceNumbering,
    /// Amount billed; equals the booking total.
    pub amount: Decimal,
    /// Payment status.
    pub status: InvoiceStatus,
    /// When the invoice was issued.
    pub issued_at: DateTime<Utc>,
}

impl Invoice {
    /// Renders an invoice number from its parts.
    pub fn format_number(prefix: &str, year: i32, sequence: i64) -> String {
        format!("{prefix}-{year}-{sequence:05}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_pads_sequence() {
        assert_eq!(Invoice::format_number("INV", 2026, 7), "INV-2026-00007");
        assert_eq!(Invoice::format_number("EXPO", 2026, 123456), "EXPO-2026-123456");
    }
}
