//! Allocation value objects returned to callers.

pub mod capacity;
pub mod outcome;

pub use capacity::CapacityDetails;
pub use outcome::{AssignOutcome, AssignResult};
