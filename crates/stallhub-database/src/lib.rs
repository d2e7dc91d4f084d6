//! # stallhub-database
//!
//! Storage for the allocation core. [`store`] defines the conditional-write
//! primitives every backend provides; [`postgres`] implements them over a
//! sqlx pool and [`memory`] over concurrent maps for single-node use and
//! tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod store;

pub use connection::DatabasePool;
pub use memory::{MemoryStore, StoreOp};
pub use postgres::PgBookingStore;
pub use store::{BookingStore, SessionMode, StoreSession};
