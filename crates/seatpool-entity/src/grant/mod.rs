//! Grant (time-bounded seat allotment) entities.

pub mod model;

pub use model::Grant;
