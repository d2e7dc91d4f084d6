//! Price breakdown stored on a booking.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Charges for a single stall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StallCharge {
    /// Stall charged.
    pub stall_id: Uuid,
    /// Stall number at the time of booking.
    pub stall_number: String,
    /// Billable area.
    pub area: Decimal,
    /// Rate per unit area.
    pub rate: Decimal,
    /// `rate * area`, rounded.
    pub base_amount: Decimal,
    /// Discount attributed to this stall.
    pub discount_amount: Decimal,
    /// `base_amount - discount_amount`.
    pub amount_after_discount: Decimal,
}

/// One applied tax line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCharge {
    /// Tax name.
    pub name: String,
    /// Rate in percent.
    pub rate: Decimal,
    /// Amount charged.
    pub amount: Decimal,
}

/// The complete financial terms of a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Per-stall charges in request order.
    pub stalls: Vec<StallCharge>,
    /// Sum of stall base amounts.
    pub base_amount: Decimal,
    /// Sum of stall discounts.
    pub discount_amount: Decimal,
    /// Sum of stall post-discount amounts.
    pub amount_after_discount: Decimal,
    /// Applied tax lines.
    pub taxes: Vec<TaxCharge>,
    /// Sum of tax lines.
    pub tax_amount: Decimal,
    /// `amount_after_discount + tax_amount`.
    pub total_amount: Decimal,
}
