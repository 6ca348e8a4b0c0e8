//! Core type definitions used across the SeatPool workspace.

pub mod id;
pub mod policy;
pub mod pool;

pub use id::*;
pub use policy::{AllocationPolicy, InvalidPolicy};
pub use pool::{PoolId, PoolLockKey};
