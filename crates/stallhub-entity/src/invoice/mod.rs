//! Invoice domain entities.

pub mod model;

pub use model::{Invoice, InvoiceNumbering, InvoiceStatus};
