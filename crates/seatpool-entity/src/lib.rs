//! # seatpool-entity
//!
//! Domain entity models for SeatPool. `grant` and `assignment` structs
//! represent database table rows and derive `sqlx::FromRow`; `allocation`
//! holds the value objects returned by the allocator.

pub mod allocation;
pub mod assignment;
pub mod grant;
