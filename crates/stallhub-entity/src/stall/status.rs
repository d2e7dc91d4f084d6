//! Stall status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Allocation status of a stall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "stall_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StallStatus {
    /// Free to be locked.
    Available,
    /// Temporarily held by a lock pending confirmation.
    Reserved,
    /// Permanently allocated to a booking.
    Booked,
}

impl StallStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Booked => "booked",
        }
    }
}

impl fmt::Display for StallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
