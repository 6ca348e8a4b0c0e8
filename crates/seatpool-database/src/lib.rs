//! # seatpool-database
//!
//! PostgreSQL connection management, migrations, repositories for grants
//! and assignments, and the transactional [`PgAllocationStore`].

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::{AssignmentRepository, GrantRepository, PgAllocationStore};
