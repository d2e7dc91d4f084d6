//! # stallhub-worker
//!
//! Background maintenance for StallHub. The only job today is the lock
//! reaper, which returns stalls abandoned by failed allocations to
//! `available` once their lock TTL has passed.

pub mod jobs;
pub mod scheduler;

pub use jobs::LockReaper;
pub use scheduler::CronScheduler;
