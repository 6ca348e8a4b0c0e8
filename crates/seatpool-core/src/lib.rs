//! # seatpool-core
//!
//! Core crate for SeatPool. Contains configuration schemas, typed
//! identifiers, pool identity and lock-key types, the allocation policy,
//! the storage/unit-of-work traits, and the unified error system.
//!
//! This crate has **no** internal dependencies on other SeatPool crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
