//! # stallhub-booking
//!
//! The allocation core: conditional stall locking, invoice sequence
//! minting, pricing, and the orchestrator that ties them into one
//! all-or-nothing `allocate` call.

pub mod allocation;
pub mod lock;
pub mod pricing;
pub mod sequence;

#[cfg(test)]
mod test_support;

pub use allocation::{
    AllocationError, AllocationOutcome, AllocationRequest, BookingOrchestrator, StallConflict,
};
pub use lock::{ConflictReason, LockError, LockHandle, LockManager};
pub use pricing::PriceCalculator;
pub use sequence::{SequenceCounter, SequenceValue};
