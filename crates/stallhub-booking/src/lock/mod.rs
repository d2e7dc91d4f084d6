//! Conditional acquire, release and confirm over stall records.

mod error;
mod manager;

pub use error::{ConflictReason, LockError};
pub use manager::{LockHandle, LockManager};
