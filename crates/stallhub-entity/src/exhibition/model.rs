//! Exhibition entity model.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::requester::RequesterRole;

use super::pricing::{Discount, TaxRate};

/// Lifecycle status of an exhibition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "exhibition_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExhibitionStatus {
    /// Being set up; not visible to exhibitors.
    Draft,
    /// Open for bookings.
    Published,
    /// Event is over.
    Completed,
}

impl fmt::Display for ExhibitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// An exhibition whose stalls are allocated by the booking core.
///
/// The allocation core only reads exhibitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exhibition {
    /// Unique exhibition identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: ExhibitionStatus,
    /// Administrative on/off switch, independent of status.
    pub is_active: bool,
    /// Prefix for invoice numbers, e.g. `"INV"`.
    pub invoice_prefix: String,
    /// Discounts operators may apply.
    pub discounts: Vec<Discount>,
    /// Discounts exhibitors may apply through self-service.
    pub public_discounts: Vec<Discount>,
    /// Tax lines applied to every booking.
    pub taxes: Vec<TaxRate>,
}

impl Exhibition {
    /// Whether stalls can currently be booked.
    pub fn is_bookable(&self) -> bool {
        self.status == ExhibitionStatus::Published && self.is_active
    }

    /// The discount list available to `role`. The two lists are never merged.
    pub fn discounts_for(&self, role: RequesterRole) -> &[Discount] {
        match role {
            RequesterRole::Operator => &self.discounts,
            RequesterRole::Exhibitor => &self.public_discounts,
        }
    }

    /// Tax lines that are switched on.
    pub fn active_taxes(&self) -> impl Iterator<Item = &TaxRate> {
        self.taxes.iter().filter(|t| t.is_active)
    }
}
