//! # stallhub-entity
//!
//! Domain entity models for StallHub. Every struct in this crate
//! represents a database record or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize` and `Deserialize`; status enums
//! additionally derive `sqlx::Type` and map onto PostgreSQL enum types.

pub mod booking;
pub mod exhibition;
pub mod invoice;
pub mod requester;
pub mod stall;
