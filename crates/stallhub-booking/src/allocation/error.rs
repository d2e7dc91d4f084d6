use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use stallhub_core::error::{AppError, ErrorKind};

use crate::lock::{ConflictReason, LockError};

/// A stall that blocked an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StallConflict {
    /// The stall.
    pub stall_id: Uuid,
    /// Why it could not be taken.
    pub reason: ConflictReason,
}

/// Why an allocation did not happen.
///
/// In every case nothing was persisted and every stall this call locked
/// has been released again.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The request itself is unacceptable. Retrying it unchanged fails again.
    #[error("Invalid allocation request: {0}")]
    Validation(String),

    /// Requested stalls were taken. Retryable once the caller refreshes.
    #[error("Stalls unavailable: {}", describe(.conflicts))]
    Conflict {
        /// The stalls that blocked the allocation.
        conflicts: Vec<StallConflict>,
    },

    /// Storage failure or a broken invariant.
    #[error("Allocation failed: {0}")]
    Fatal(#[source] AppError),
}

impl AllocationError {
    /// Whether the caller may retry after refreshing availability.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Stalls named by a conflict; empty for other failures.
    pub fn conflicting_stalls(&self) -> Vec<Uuid> {
        match self {
            Self::Conflict { conflicts } => conflicts.iter().map(|c| c.stall_id).collect(),
            _ => Vec::new(),
        }
    }
}

fn describe(conflicts: &[StallConflict]) -> String {
    conflicts
        .iter()
        .map(|c| format!("{} ({})", c.stall_id, c.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<LockError> for AllocationError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Conflict {
                stall_id,
                reason: ConflictReason::NotFound,
            } => Self::Validation(format!("Stall {stall_id} does not exist")),
            LockError::Conflict { stall_id, reason } => Self::Conflict {
                conflicts: vec![StallConflict { stall_id, reason }],
            },
            LockError::ConfirmMismatch { .. } => Self::Fatal(AppError::internal(err.to_string())),
            LockError::Store(e) => Self::Fatal(e),
        }
    }
}

impl From<AppError> for AllocationError {
    fn from(err: AppError) -> Self {
        match err.kind {
            ErrorKind::Validation => Self::Validation(err.message),
            _ => Self::Fatal(err),
        }
    }
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Validation(msg) => AppError::validation(msg),
            AllocationError::Conflict { .. } => AppError::conflict(err.to_string()),
            AllocationError::Fatal(e) => {
                AppError::with_source(ErrorKind::Internal, format!("Allocation failed: {e}"), e)
            }
        }
    }
}
