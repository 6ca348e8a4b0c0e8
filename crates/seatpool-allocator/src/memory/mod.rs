//! In-memory storage backend.
//!
//! Suitable for single-node deployments and tests. Pool locks come from a
//! keyed, reference-counted mutex table; each lock guard is owned by the
//! unit of work that took it.

pub mod lock_table;
pub mod store;

pub use lock_table::{PoolLockGuard, PoolLockTable};
pub use store::{MemoryAllocationStore, MemoryUnitOfWork};
