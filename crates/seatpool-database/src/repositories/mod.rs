//! Repositories for grants and assignments, and the allocation store.

pub mod assignment;
pub mod grant;
pub mod store;

pub use assignment::AssignmentRepository;
pub use grant::GrantRepository;
pub use store::PgAllocationStore;
