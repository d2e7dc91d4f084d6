use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use stallhub_core::error::AppError;

/// Why a stall could not be locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Already allocated to a booking.
    Booked,
    /// Held by another requester's live lock.
    Locked,
    /// No such stall.
    NotFound,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Booked => "booked",
            Self::Locked => "locked",
            Self::NotFound => "not_found",
        };
        write!(f, "{s}")
    }
}

/// Lock manager failures.
#[derive(Debug, Error)]
pub enum LockError {
    /// A stall could not be locked; everything acquired before it was released.
    #[error("Stall {stall_id} is unavailable ({reason})")]
    Conflict {
        /// The first stall that failed.
        stall_id: Uuid,
        /// Why it failed.
        reason: ConflictReason,
    },

    /// Confirm converted fewer stalls than were locked.
    #[error("Lock {lock_id} confirmed {confirmed} of {expected} stalls")]
    ConfirmMismatch {
        /// Lock being confirmed.
        lock_id: Uuid,
        /// Stalls expected to convert.
        expected: u64,
        /// Stalls actually converted.
        confirmed: u64,
    },

    /// The store failed.
    #[error(transparent)]
    Store(#[from] AppError),
}
