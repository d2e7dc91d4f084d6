//! Booking entity model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::requester::RequesterRole;

use super::billing::BillingDetails;
use super::pricing::PriceBreakdown;
use super::status::{BookingSource, BookingStatus, PaymentStatus};

/// The durable record of a successful allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier.
    pub id: Uuid,
    /// Exhibition the stalls belong to.
    pub exhibition_id: Uuid,
    /// Allocated stalls, in request order.
    pub stall_ids: Vec<Uuid>,
    /// Who booked.
    pub requester_id: Uuid,
    /// Role the booking was made under.
    pub requester_role: RequesterRole,
    /// Channel the booking came through.
    pub source: BookingSource,
    /// Approval workflow status.
    pub status: BookingStatus,
    /// Payment progress.
    pub payment_status: PaymentStatus,
    /// Discount applied, if any.
    pub discount_id: Option<String>,
    /// Invoice addressee.
    pub billing: BillingDetails,
    /// Financial terms.
    pub pricing: PriceBreakdown,
    /// When the booking was created.
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Total amount due, taxes included.
    pub fn total_amount(&self) -> Decimal {
        self.pricing.total_amount
    }
}
