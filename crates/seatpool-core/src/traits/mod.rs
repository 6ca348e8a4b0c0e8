//! Core traits defined in `seatpool-core` and implemented by other crates.

pub mod store;

pub use store::{AllocationStore, UnitOfWork};
