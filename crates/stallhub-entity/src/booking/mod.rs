//! Booking domain entities.

pub mod billing;
pub mod model;
pub mod pricing;
pub mod status;

pub use billing::BillingDetails;
pub use model::Booking;
pub use pricing::{PriceBreakdown, StallCharge, TaxCharge};
pub use status::{BookingSource, BookingStatus, PaymentStatus};
