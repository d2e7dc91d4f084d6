//! The `allocate` entrypoint.

mod error;
mod orchestrator;
mod request;

use serde::Serialize;

use stallhub_entity::booking::Booking;
use stallhub_entity::invoice::Invoice;

pub use error::{AllocationError, StallConflict};
pub use orchestrator::BookingOrchestrator;
pub use request::AllocationRequest;

/// What a successful allocation produced.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationOutcome {
    /// The new booking; its stalls are now `booked`.
    pub booking: Booking,
    /// The invoice issued for it.
    pub invoice: Invoice,
}
