//! Assignment (seat held by one requester) entities.

pub mod model;

pub use model::Assignment;
