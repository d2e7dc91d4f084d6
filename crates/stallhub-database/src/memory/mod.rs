//! In-process booking store backed by concurrent maps.
//!
//! Used for single-node deployments and as the test double for the
//! allocation core. Every conditional write happens under the owning
//! shard's guard, so the check and the update cannot interleave with
//! another writer. Transactional sessions keep an undo journal that is
//! replayed on rollback or when the session is dropped uncommitted.
//!
//! Individual operations can be made to fail on demand with
//! [`MemoryStore::inject_fault`], and [`MemoryStore::before`] runs a
//! callback right before an operation executes.

mod session;
mod store;

pub use session::MemorySession;
pub use store::{MemoryStore, StoreOp};
