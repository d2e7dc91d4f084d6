//! Booking status enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::requester::RequesterRole;

/// Approval workflow status of a booking.
///
/// Independent of stall status: a `pending` booking already owns its
/// stalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Awaiting approval.
    Pending,
    /// Approved by an operator.
    Approved,
    /// Rejected by an operator.
    Rejected,
    /// Cancelled after creation.
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Payment progress of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Nothing paid yet.
    Pending,
    /// Partially paid.
    Partial,
    /// Fully paid.
    Paid,
    /// Refunded.
    Refunded,
}

/// Channel a booking was created through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    /// Back-office.
    Admin,
    /// Self-service portal.
    ExhibitorPortal,
}

impl From<RequesterRole> for BookingSource {
    fn from(role: RequesterRole) -> Self {
        match role {
            RequesterRole::Operator => Self::Admin,
            RequesterRole::Exhibitor => Self::ExhibitorPortal,
        }
    }
}
