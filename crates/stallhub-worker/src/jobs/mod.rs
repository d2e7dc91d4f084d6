//! Scheduled job implementations.

pub mod lock_reaper;

pub use lock_reaper::LockReaper;
