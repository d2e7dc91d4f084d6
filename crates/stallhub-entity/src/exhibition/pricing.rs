//! Discount and tax configuration, consumed as opaque input.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// `value` is a percentage of each stall's base amount.
    Percentage,
    /// `value` is a currency amount spread across the stalls.
    Fixed,
}

/// A discount configured on an exhibition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    /// Identifier referenced by allocation requests.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Percentage or fixed amount.
    pub kind: DiscountKind,
    /// Percentage (0-100) or currency amount.
    pub value: Decimal,
    /// Inactive discounts cannot be applied.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A tax line configured on an exhibition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRate {
    /// Display name, e.g. "GST".
    pub name: String,
    /// Rate in percent.
    pub rate: Decimal,
    /// Inactive lines are skipped.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}
