//! Storage and unit-of-work traits consumed by the allocator.
//!
//! Every read and write the allocator performs happens inside a
//! [`UnitOfWork`]. The pool lock taken through [`UnitOfWork::lock_pool`]
//! belongs to that unit of work and is released exactly when it commits,
//! rolls back, or is dropped.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::result::AppResult;
use crate::types::id::RequesterId;
use crate::types::pool::{PoolId, PoolLockKey};

/// Factory for units of work against persistent storage.
///
/// Two implementations are provided:
/// - PostgreSQL (`seatpool-database`), using transaction-scoped advisory locks
/// - In-memory (`seatpool-allocator`), using a keyed mutex table
#[async_trait]
pub trait AllocationStore: Send + Sync + std::fmt::Debug {
    /// Begin a read-write unit of work.
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;

    /// Begin a read-only unit of work whose reads all observe one snapshot.
    async fn begin_read_snapshot(&self) -> AppResult<Box<dyn UnitOfWork>>;
}

/// One atomic unit of work.
///
/// Dropping a unit of work without calling [`commit`](Self::commit) must
/// behave like [`rollback`](Self::rollback): pending writes are discarded
/// and any pool lock is released.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Block until the exclusive lock for `key` is held by this unit of work.
    ///
    /// Fails with [`ErrorKind::LockUnavailable`](crate::error::ErrorKind::LockUnavailable)
    /// when a bounded wait is configured and expires.
    async fn lock_pool(&mut self, key: PoolLockKey) -> AppResult<()>;

    /// Sum of `seat_count` over grants of `pool` with `now < expires_at`.
    async fn sum_active_seat_count(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Number of distinct requesters holding a live assignment in `pool`.
    async fn distinct_live_holder_count(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// `(total, used)` for `pool`, observed by a single read.
    ///
    /// `total` is what [`sum_active_seat_count`](Self::sum_active_seat_count)
    /// returns and `used` what
    /// [`distinct_live_holder_count`](Self::distinct_live_holder_count)
    /// returns, but both come from the same view of storage, so a grant
    /// committed concurrently is either in both figures or in neither.
    async fn active_capacity(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<(u64, u64)>;

    /// Requesters holding a live assignment in `pool`.
    async fn live_holder_ids(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<HashSet<RequesterId>>;

    /// Insert one assignment per requester in a single bulk write.
    async fn insert_assignments(
        &mut self,
        pool: &PoolId,
        requesters: &[RequesterId],
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Make all writes durable and release the pool lock.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard all writes and release the pool lock.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
