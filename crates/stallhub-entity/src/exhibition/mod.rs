//! Exhibition domain entities and the pricing configuration they carry.

pub mod model;
pub mod pricing;

pub use model::{Exhibition, ExhibitionStatus};
pub use pricing::{Discount, DiscountKind, TaxRate};
