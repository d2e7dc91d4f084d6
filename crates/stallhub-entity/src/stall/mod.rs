//! Stall domain entities.

pub mod lock;
pub mod model;
pub mod shape;
pub mod status;

pub use lock::StallLock;
pub use model::{Stall, StallParts};
pub use shape::{Rect, StallShape};
pub use status::StallStatus;
