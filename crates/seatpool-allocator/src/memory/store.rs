//! In-memory implementation of [`AllocationStore`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use seatpool_core::error::AppError;
use seatpool_core::result::AppResult;
use seatpool_core::traits::{AllocationStore, UnitOfWork};
use seatpool_core::types::{PoolId, PoolLockKey, RequesterId};
use seatpool_entity::assignment::Assignment;
use seatpool_entity::grant::Grant;

use super::lock_table::{PoolLockGuard, PoolLockTable};

/// Committed rows.
#[derive(Debug, Clone, Default)]
struct MemoryState {
    grants: Vec<Grant>,
    assignments: Vec<Assignment>,
}

impl MemoryState {
    fn has_active_grant(&self, pool: &PoolId, now: DateTime<Utc>) -> bool {
        self.grants
            .iter()
            .any(|g| g.pool() == *pool && g.is_active_at(now))
    }

    fn holds(&self, pool: &PoolId, requester: &RequesterId) -> bool {
        self.assignments
            .iter()
            .any(|a| a.pool() == *pool && a.requester() == *requester)
    }
}

/// In-memory grant and assignment storage.
///
/// Cloning shares the same rows and lock table.
#[derive(Debug, Clone)]
pub struct MemoryAllocationStore {
    state: Arc<Mutex<MemoryState>>,
    locks: Arc<PoolLockTable>,
    lock_timeout: Option<Duration>,
}

impl Default for MemoryAllocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAllocationStore {
    /// Create an empty store whose pool locks wait indefinitely.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            locks: Arc::new(PoolLockTable::new()),
            lock_timeout: None,
        }
    }

    /// Bound how long a unit of work waits for a pool lock.
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// The lock table shared by this store's units of work.
    pub fn lock_table(&self) -> &Arc<PoolLockTable> {
        &self.locks
    }

    /// Issue a grant of `seat_count` seats valid for `[issued_at, expires_at)`.
    pub async fn add_grant(
        &self,
        pool: &PoolId,
        seat_count: i32,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Grant> {
        if seat_count <= 0 {
            return Err(AppError::validation(format!(
                "Seat count must be positive, got {seat_count}"
            )));
        }
        if expires_at <= issued_at {
            return Err(AppError::validation(
                "Grant must expire after it is issued",
            ));
        }

        let grant = Grant {
            id: Uuid::new_v4(),
            tenant_id: pool.tenant_id.into_uuid(),
            resource_id: pool.resource_id.into_uuid(),
            seat_count,
            issued_at,
            expires_at,
            created_at: Utc::now(),
        };

        self.state.lock().await.grants.push(grant.clone());
        info!(pool = %pool, seat_count, expires_at = %expires_at, "Grant added");
        Ok(grant)
    }

    /// Insert assignments directly, bypassing the pool lock and the
    /// capacity check.
    ///
    /// Can leave a pool oversubscribed; use [`Allocator`] for anything
    /// but fixtures and bulk imports of already-valid rows. Existing
    /// holders are skipped. Returns the number of rows written.
    ///
    /// [`Allocator`]: crate::Allocator
    pub async fn seed_assignments_unchecked(
        &self,
        pool: &PoolId,
        requesters: &[RequesterId],
        assigned_at: DateTime<Utc>,
    ) -> usize {
        let mut state = self.state.lock().await;
        let mut written = 0;
        for requester in requesters {
            if !state.holds(pool, requester) {
                state
                    .assignments
                    .push(Assignment::new(pool, *requester, assigned_at));
                written += 1;
            }
        }
        written
    }

    /// Remove the given requesters' assignments. Returns rows removed.
    ///
    /// Freeing seats cannot oversubscribe a pool, so no lock is taken.
    pub async fn unassign(&self, pool: &PoolId, requesters: &[RequesterId]) -> u64 {
        let targets: HashSet<RequesterId> = requesters.iter().copied().collect();
        let mut state = self.state.lock().await;
        let before = state.assignments.len();
        state
            .assignments
            .retain(|a| !(a.pool() == *pool && targets.contains(&a.requester())));
        let removed = (before - state.assignments.len()) as u64;
        info!(pool = %pool, removed, "Assignments removed");
        removed
    }

    /// All grants of `pool`, active or not.
    pub async fn grants(&self, pool: &PoolId) -> Vec<Grant> {
        self.state
            .lock()
            .await
            .grants
            .iter()
            .filter(|g| g.pool() == *pool)
            .cloned()
            .collect()
    }

    /// All assignment rows of `pool`, live or dormant.
    pub async fn assignments(&self, pool: &PoolId) -> Vec<Assignment> {
        self.state
            .lock()
            .await
            .assignments
            .iter()
            .filter(|a| a.pool() == *pool)
            .cloned()
            .collect()
    }

    fn unit_of_work(&self, snapshot: Option<MemoryState>) -> MemoryUnitOfWork {
        MemoryUnitOfWork {
            state: Arc::clone(&self.state),
            locks: Arc::clone(&self.locks),
            lock_timeout: self.lock_timeout,
            snapshot,
            pending: Vec::new(),
            held: Vec::new(),
        }
    }
}

#[async_trait]
impl AllocationStore for MemoryAllocationStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(self.unit_of_work(None)))
    }

    async fn begin_read_snapshot(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let snapshot = self.state.lock().await.clone();
        Ok(Box::new(self.unit_of_work(Some(snapshot))))
    }
}

/// Unit of work over a [`MemoryAllocationStore`].
///
/// Writes are staged until commit. Reads see committed rows plus this unit
/// of work's own staged rows, or a frozen copy for read snapshots. Pool
/// lock guards live here, so dropping the unit of work releases them.
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    state: Arc<Mutex<MemoryState>>,
    locks: Arc<PoolLockTable>,
    lock_timeout: Option<Duration>,
    snapshot: Option<MemoryState>,
    pending: Vec<Assignment>,
    held: Vec<PoolLockGuard>,
}

impl MemoryUnitOfWork {
    /// Run `f` against the rows this unit of work can see.
    async fn view<R>(&self, f: impl FnOnce(&MemoryState) -> R) -> R {
        if let Some(snapshot) = &self.snapshot {
            return f(snapshot);
        }

        let committed = self.state.lock().await;
        if self.pending.is_empty() {
            return f(&*committed);
        }

        let mut merged = committed.clone();
        drop(committed);
        merged.assignments.extend(self.pending.iter().cloned());
        f(&merged)
    }

    fn active_seats_in(state: &MemoryState, pool: &PoolId, now: DateTime<Utc>) -> u64 {
        state
            .grants
            .iter()
            .filter(|g| g.pool() == *pool && g.is_active_at(now))
            .map(|g| u64::try_from(g.seat_count).unwrap_or(0))
            .sum()
    }

    fn live_holders_in(
        state: &MemoryState,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> HashSet<RequesterId> {
        if !state.has_active_grant(pool, now) {
            return HashSet::new();
        }
        state
            .assignments
            .iter()
            .filter(|a| a.pool() == *pool)
            .map(Assignment::requester)
            .collect()
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_pool(&mut self, key: PoolLockKey) -> AppResult<()> {
        if self.held.iter().any(|guard| guard.key() == key) {
            return Ok(());
        }
        let guard = self.locks.acquire(key, self.lock_timeout).await?;
        self.held.push(guard);
        Ok(())
    }

    async fn sum_active_seat_count(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        Ok(self
            .view(|state| Self::active_seats_in(state, pool, now))
            .await)
    }

    async fn distinct_live_holder_count(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let holders = self
            .view(|state| Self::live_holders_in(state, pool, now))
            .await;
        Ok(holders.len() as u64)
    }

    async fn active_capacity(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<(u64, u64)> {
        let counts = self
            .view(|state| {
                let total = Self::active_seats_in(state, pool, now);
                let used = Self::live_holders_in(state, pool, now).len() as u64;
                (total, used)
            })
            .await;
        Ok(counts)
    }

    async fn live_holder_ids(
        &mut self,
        pool: &PoolId,
        now: DateTime<Utc>,
    ) -> AppResult<HashSet<RequesterId>> {
        Ok(self
            .view(|state| Self::live_holders_in(state, pool, now))
            .await)
    }

    async fn insert_assignments(
        &mut self,
        pool: &PoolId,
        requesters: &[RequesterId],
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.snapshot.is_some() {
            return Err(AppError::validation(
                "Cannot write assignments in a read-only unit of work",
            ));
        }
        self.pending.extend(
            requesters
                .iter()
                .map(|requester| Assignment::new(pool, *requester, now)),
        );
        debug!(pool = %pool, staged = requesters.len(), "Assignments staged");
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryUnitOfWork {
            state,
            pending,
            held,
            ..
        } = *self;

        if !pending.is_empty() {
            let mut state = state.lock().await;
            for row in pending {
                if !state.holds(&row.pool(), &row.requester()) {
                    state.assignments.push(row);
                }
            }
        }

        drop(held);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        if !self.pending.is_empty() {
            debug!(discarded = self.pending.len(), "Staged assignments discarded");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use seatpool_core::error::ErrorKind;
    use seatpool_core::types::{ResourceId, TenantId};

    use super::*;

    fn pool() -> PoolId {
        PoolId::new(TenantId::new(), ResourceId::new())
    }

    #[tokio::test]
    async fn test_add_grant_validates_input() {
        let store = MemoryAllocationStore::new();
        let pool = pool();
        let now = Utc::now();

        let err = store
            .add_grant(&pool, 0, now, now + ChronoDuration::days(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = store.add_grant(&pool, 5, now, now).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        store
            .add_grant(&pool, 5, now, now + ChronoDuration::days(1))
            .await
            .expect("grant");
        assert_eq!(store.grants(&pool).await.len(), 1);
        assert!(store.grants(&PoolId::new(TenantId::new(), ResourceId::new())).await.is_empty());
    }

    #[tokio::test]
    async fn test_staged_rows_are_private_until_commit() {
        let store = MemoryAllocationStore::new();
        let pool = pool();
        let now = Utc::now();
        store
            .add_grant(&pool, 2, now - ChronoDuration::hours(1), now + ChronoDuration::days(1))
            .await
            .expect("grant");
        let requester = RequesterId::new();

        let mut uow = store.begin().await.expect("begin");
        uow.insert_assignments(&pool, &[requester], now)
            .await
            .expect("stage");
        assert_eq!(
            uow.distinct_live_holder_count(&pool, now).await.expect("own view"),
            1
        );
        assert!(store.assignments(&pool).await.is_empty());

        uow.commit().await.expect("commit");
        assert_eq!(store.assignments(&pool).await.len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_discards_rows_and_lock() {
        let store = MemoryAllocationStore::new();
        let pool = pool();
        let key = PoolLockKey::reduce(42);

        let mut uow = store.begin().await.expect("begin");
        uow.lock_pool(key).await.expect("lock");
        uow.lock_pool(key).await.expect("reentrant");
        uow.insert_assignments(&pool, &[RequesterId::new()], Utc::now())
            .await
            .expect("stage");
        assert_eq!(store.lock_table().active_keys(), 1);

        drop(uow);
        assert_eq!(store.lock_table().active_keys(), 0);
        assert!(store.assignments(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn test_read_snapshot_is_read_only_and_frozen() {
        let store = MemoryAllocationStore::new();
        let pool = pool();
        let now = Utc::now();
        store
            .add_grant(&pool, 3, now - ChronoDuration::hours(1), now + ChronoDuration::days(1))
            .await
            .expect("grant");

        let mut snapshot = store.begin_read_snapshot().await.expect("snapshot");
        store.seed_assignments_unchecked(&pool, &[RequesterId::new()], now).await;

        assert_eq!(
            snapshot.distinct_live_holder_count(&pool, now).await.expect("count"),
            0
        );
        let err = snapshot
            .insert_assignments(&pool, &[RequesterId::new()], now)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_active_capacity_reads_total_and_holders_together() {
        let store = MemoryAllocationStore::new();
        let pool = pool();
        let now = Utc::now();
        store
            .seed_assignments_unchecked(&pool, &[RequesterId::new(), RequesterId::new()], now)
            .await;

        let mut uow = store.begin().await.expect("begin");
        assert_eq!(uow.active_capacity(&pool, now).await.expect("dormant"), (0, 0));

        store
            .add_grant(&pool, 5, now - ChronoDuration::hours(1), now + ChronoDuration::days(1))
            .await
            .expect("grant");
        assert_eq!(uow.active_capacity(&pool, now).await.expect("revived"), (5, 2));

        uow.insert_assignments(&pool, &[RequesterId::new()], now)
            .await
            .expect("stage");
        assert_eq!(uow.active_capacity(&pool, now).await.expect("staged"), (5, 3));
    }

    #[tokio::test]
    async fn test_unassign_only_touches_named_requesters() {
        let store = MemoryAllocationStore::new();
        let pool = pool();
        let keep = RequesterId::new();
        let free = RequesterId::new();
        store.seed_assignments_unchecked(&pool, &[keep, free, free], Utc::now()).await;

        assert_eq!(store.unassign(&pool, &[free]).await, 1);
        let left: Vec<RequesterId> = store
            .assignments(&pool)
            .await
            .iter()
            .map(Assignment::requester)
            .collect();
        assert_eq!(left, vec![keep]);
    }
}
