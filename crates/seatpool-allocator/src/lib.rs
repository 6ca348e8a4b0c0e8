//! # seatpool-allocator
//!
//! Seat allocation for SeatPool pools.
//!
//! ## Modules
//!
//! - `pool_key`: deterministic lock key for a (tenant, resource) pool
//! - `capacity`: total, consumed and free seats at an instant
//! - `holders`: live holders and the idempotency filter
//! - `allocator`: the locked, atomic allocation operation
//! - `events`: structured allocation events and their sinks
//! - `memory`: in-memory store with a keyed mutex table (single node, tests)

pub mod allocator;
pub mod capacity;
pub mod error;
pub mod events;
pub mod holders;
pub mod memory;
pub mod pool_key;

pub use allocator::{AssignRequest, Allocator};
pub use error::AllocationError;
pub use events::{AllocationEvent, AllocationEventSink, RecordingEventSink, TracingEventSink};
pub use memory::{MemoryAllocationStore, PoolLockTable};
