//! Shared test helpers for allocator integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use seatpool_allocator::{Allocator, MemoryAllocationStore, RecordingEventSink};
use seatpool_core::error::AppError;
use seatpool_core::result::AppResult;
use seatpool_core::traits::{AllocationStore, UnitOfWork};
use seatpool_core::types::{PoolId, PoolLockKey, RequesterId, ResourceId, TenantId};

/// Allocator wired to an in-memory store and an event recorder.
pub struct TestPool {
    /// Backing store, for direct inspection.
    pub store: MemoryAllocationStore,
    /// Captured allocation events.
    pub events: Arc<RecordingEventSink>,
    /// Allocator under test.
    pub allocator: Allocator,
    /// Pool with one active grant.
    pub pool: PoolId,
}

impl TestPool {
    /// A fresh store with one pool holding an active grant of `seats`.
    pub async fn new(seats: i32) -> Self {
        Self::with_store(MemoryAllocationStore::new(), seats).await
    }

    /// Same as [`TestPool::new`] over an existing store.
    pub async fn with_store(store: MemoryAllocationStore, seats: i32) -> Self {
        let pool = new_pool();
        add_active_grant(&store, &pool, seats).await;
        let events = Arc::new(RecordingEventSink::new());
        let allocator = Allocator::new(Arc::new(store.clone()), events.clone());
        Self {
            store,
            events,
            allocator,
            pool,
        }
    }

    /// Number of stored assignment rows for the pool.
    pub async fn stored(&self) -> usize {
        self.store.assignments(&self.pool).await.len()
    }

    /// Requester IDs stored for the pool.
    pub async fn stored_ids(&self) -> HashSet<RequesterId> {
        self.store
            .assignments(&self.pool)
            .await
            .iter()
            .map(|a| a.requester())
            .collect()
    }
}

/// A pool with random identifiers.
pub fn new_pool() -> PoolId {
    PoolId::new(TenantId::new(), ResourceId::new())
}

/// `n` fresh requester IDs.
pub fn requesters(n: usize) -> Vec<RequesterId> {
    (0..n).map(|_| RequesterId::new()).collect()
}

/// Add a grant active from yesterday for thirty days.
pub async fn add_active_grant(store: &MemoryAllocationStore, pool: &PoolId, seats: i32) {
    let now = Utc::now();
    store
        .add_grant(pool, seats, now - Duration::days(1), now + Duration::days(30))
        .await
        .expect("grant");
}

/// Add a grant valid over `[from, until)`.
pub async fn add_grant_between(
    store: &MemoryAllocationStore,
    pool: &PoolId,
    seats: i32,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) {
    store
        .add_grant(pool, seats, from, until)
        .await
        .expect("grant");
}

/// Store operation at which a [`FaultyStore`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    Begin,
    LockPool,
    LiveHolderIds,
    ActiveCapacity,
    InsertAssignments,
    Commit,
}

/// What happens at the fault point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Return a database error instead of running the operation.
    Fail(FaultPoint),
    /// Run the operation, then never return.
    Stall(FaultPoint),
}

/// Wraps a memory store and injects one fault into every unit of work.
#[derive(Debug, Clone)]
pub struct FaultyStore {
    inner: MemoryAllocationStore,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(inner: MemoryAllocationStore, fault: Fault) -> Self {
        Self { inner, fault }
    }
}

fn injected(point: FaultPoint) -> AppError {
    AppError::database(format!("injected failure at {point:?}"))
}

#[async_trait]
impl AllocationStore for FaultyStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        if self.fault == Fault::Fail(FaultPoint::Begin) {
            return Err(injected(FaultPoint::Begin));
        }
        Ok(Box::new(FaultyUnitOfWork {
            inner: self.inner.begin().await?,
            fault: self.fault,
        }))
    }

    async fn begin_read_snapshot(&self) -> AppResult<Box<dyn UnitOfWork>> {
        self.inner.begin_read_snapshot().await
    }
}

struct FaultyUnitOfWork {
    inner: Box<dyn UnitOfWork>,
    fault: Fault,
}

impl FaultyUnitOfWork {
    fn check(&self, point: FaultPoint) -> AppResult<()> {
        if self.fault == Fault::Fail(point) {
            return Err(injected(point));
        }
        Ok(())
    }
}

async fn stall_if(fault: Fault, point: FaultPoint) {
    if fault == Fault::Stall(point) {
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl UnitOfWork for FaultyUnitOfWork {
    async fn lock_pool(&mut self, key: PoolLockKey) -> AppResult<()> {
        self.check(FaultPoint::LockPool)?;
        self.inner.lock_pool(key).await?;
        stall_if(self.fault, FaultPoint::LockPool).await;
        Ok(())
    }

    async fn sum_active_seat_count(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        self.inner.sum_active_seat_count(pool, now).await
    }

    async fn distinct_live_holder_count(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        self.inner.distinct_live_holder_count(pool, now).await
    }

    async fn active_capacity(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<(u64, u64)> {
        self.check(FaultPoint::ActiveCapacity)?;
        let counts = self.inner.active_capacity(pool, now).await?;
        stall_if(self.fault, FaultPoint::ActiveCapacity).await;
        Ok(counts)
    }

    async fn live_holder_ids(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<HashSet<RequesterId>> {
        self.check(FaultPoint::LiveHolderIds)?;
        let ids = self.inner.live_holder_ids(pool, now).await?;
        stall_if(self.fault, FaultPoint::LiveHolderIds).await;
        Ok(ids)
    }

    async fn insert_assignments(
        &mut self,
        pool: &PoolId,
        requesters: &[RequesterId],
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.check(FaultPoint::InsertAssignments)?;
        self.inner.insert_assignments(pool, requesters, now).await?;
        stall_if(self.fault, FaultPoint::InsertAssignments).await;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.check(FaultPoint::Commit)?;
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.inner.rollback().await
    }
}

/// Wraps a memory store and, once per unit of work, issues a grant
/// directly after the read at `after` returns.
///
/// Models an operator adding seats while an allocation is in flight.
/// Grant creation takes no pool lock.
#[derive(Debug, Clone)]
pub struct GrantingStore {
    inner: MemoryAllocationStore,
    pool: PoolId,
    seats: i32,
    after: FaultPoint,
}

impl GrantingStore {
    pub fn new(inner: MemoryAllocationStore, pool: PoolId, seats: i32, after: FaultPoint) -> Self {
        Self {
            inner,
            pool,
            seats,
            after,
        }
    }
}

#[async_trait]
impl AllocationStore for GrantingStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(GrantingUnitOfWork {
            inner: self.inner.begin().await?,
            store: self.clone(),
            issued: false,
        }))
    }

    async fn begin_read_snapshot(&self) -> AppResult<Box<dyn UnitOfWork>> {
        self.inner.begin_read_snapshot().await
    }
}

struct GrantingUnitOfWork {
    inner: Box<dyn UnitOfWork>,
    store: GrantingStore,
    issued: bool,
}

impl GrantingUnitOfWork {
    async fn grant_if(&mut self, point: FaultPoint) {
        if self.issued || self.store.after != point {
            return;
        }
        self.issued = true;
        add_active_grant(&self.store.inner, &self.store.pool, self.store.seats).await;
    }
}

#[async_trait]
impl UnitOfWork for GrantingUnitOfWork {
    async fn lock_pool(&mut self, key: PoolLockKey) -> AppResult<()> {
        self.inner.lock_pool(key).await?;
        self.grant_if(FaultPoint::LockPool).await;
        Ok(())
    }

    async fn sum_active_seat_count(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        self.inner.sum_active_seat_count(pool, now).await
    }

    async fn distinct_live_holder_count(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        self.inner.distinct_live_holder_count(pool, now).await
    }

    async fn active_capacity(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<(u64, u64)> {
        let counts = self.inner.active_capacity(pool, now).await?;
        self.grant_if(FaultPoint::ActiveCapacity).await;
        Ok(counts)
    }

    async fn live_holder_ids(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<HashSet<RequesterId>> {
        let ids = self.inner.live_holder_ids(pool, now).await?;
        self.grant_if(FaultPoint::LiveHolderIds).await;
        Ok(ids)
    }

    async fn insert_assignments(
        &mut self,
        pool: &PoolId,
        requesters: &[RequesterId],
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.inner.insert_assignments(pool, requesters, now).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.inner.rollback().await
    }
}
