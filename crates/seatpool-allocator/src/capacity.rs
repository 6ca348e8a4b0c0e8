//! Pool capacity evaluation.
//!
//! All figures are computed fresh from storage at the given instant.
//! [`details`] takes total and used seats from a single store read, so the
//! two never straddle a concurrently issued grant.

use chrono::{DateTime, Utc};

use seatpool_core::traits::{AllocationStore, UnitOfWork};
use seatpool_core::types::PoolId;
use seatpool_entity::allocation::CapacityDetails;

use crate::error::AllocationError;

/// Seats contributed by grants active at `now`.
pub async fn total_seats(
    uow: &mut dyn UnitOfWork,
    pool: &PoolId,
    now: DateTime<Utc>,
) -> Result<u64, AllocationError> {
    Ok(uow.sum_active_seat_count(pool, now).await?)
}

/// Distinct requesters holding a live seat at `now`.
pub async fn consumed_seats(
    uow: &mut dyn UnitOfWork,
    pool: &PoolId,
    now: DateTime<Utc>,
) -> Result<u64, AllocationError> {
    Ok(uow.distinct_live_holder_count(pool, now).await?)
}

/// Free seats at `now`.
///
/// Fails with [`AllocationError::InvariantViolation`] if more seats are held
/// than granted.
pub async fn available_seats(
    uow: &mut dyn UnitOfWork,
    pool: &PoolId,
    now: DateTime<Utc>,
) -> Result<u64, AllocationError> {
    Ok(details(uow, pool, now).await?.available)
}

/// Total, used and available seats from one consistent read.
pub async fn details(
    uow: &mut dyn UnitOfWork,
    pool: &PoolId,
    now: DateTime<Utc>,
) -> Result<CapacityDetails, AllocationError> {
    let (total, used) = uow.active_capacity(pool, now).await?;

    let available = total
        .checked_sub(used)
        .ok_or(AllocationError::InvariantViolation {
            pool: *pool,
            total,
            used,
        })?;

    Ok(CapacityDetails {
        total,
        used,
        available,
    })
}

/// [`details`] in a dedicated read-only snapshot.
pub async fn read_details(
    store: &dyn AllocationStore,
    pool: &PoolId,
    now: DateTime<Utc>,
) -> Result<CapacityDetails, AllocationError> {
    let mut uow = store.begin_read_snapshot().await?;
    let result = details(uow.as_mut(), pool, now).await;
    uow.rollback().await?;
    result
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use seatpool_core::types::{RequesterId, ResourceId, TenantId};

    use super::*;
    use crate::memory::MemoryAllocationStore;

    fn pool() -> PoolId {
        PoolId::new(TenantId::new(), ResourceId::new())
    }

    #[tokio::test]
    async fn test_empty_pool_has_no_seats() {
        let store = MemoryAllocationStore::new();
        let details = read_details(&store, &pool(), Utc::now())
            .await
            .expect("details");

        assert_eq!(
            details,
            CapacityDetails {
                total: 0,
                used: 0,
                available: 0
            }
        );
    }

    #[tokio::test]
    async fn test_two_grants_sum_without_double_counting() {
        let store = MemoryAllocationStore::new();
        let pool = pool();
        let now = Utc::now();
        store
            .add_grant(&pool, 3, now - Duration::days(1), now + Duration::days(30))
            .await
            .expect("grant a");
        store
            .add_grant(&pool, 4, now - Duration::days(1), now + Duration::days(60))
            .await
            .expect("grant b");
        let holders: Vec<RequesterId> = (0..5).map(|_| RequesterId::new()).collect();
        store.seed_assignments_unchecked(&pool, &holders, now).await;

        let details = read_details(&store, &pool, now).await.expect("details");
        assert_eq!(details.total, 7);
        assert_eq!(details.used, 5);
        assert_eq!(details.available, 2);

        let mut uow = store.begin_read_snapshot().await.expect("begin");
        assert_eq!(available_seats(uow.as_mut(), &pool, now).await.expect("free"), 2);
    }

    #[tokio::test]
    async fn test_expired_grants_contribute_nothing() {
        let store = MemoryAllocationStore::new();
        let pool = pool();
        let now = Utc::now();
        store
            .add_grant(&pool, 10, now - Duration::days(60), now - Duration::days(30))
            .await
            .expect("expired grant");
        store
            .seed_assignments_unchecked(&pool, &[RequesterId::new(), RequesterId::new()], now)
            .await;

        let details = read_details(&store, &pool, now).await.expect("details");
        assert_eq!(details.total, 0);
        assert_eq!(details.used, 0, "dormant assignments are not live");
    }

    #[tokio::test]
    async fn test_oversubscription_is_a_fault() {
        let store = MemoryAllocationStore::new();
        let pool = pool();
        let now = Utc::now();
        store
            .add_grant(&pool, 1, now - Duration::days(1), now + Duration::days(1))
            .await
            .expect("grant");
        store
            .seed_assignments_unchecked(&pool, &[RequesterId::new(), RequesterId::new()], now)
            .await;

        let err = read_details(&store, &pool, now).await.unwrap_err();
        assert!(matches!(
            err,
            AllocationError::InvariantViolation {
                total: 1,
                used: 2,
                ..
            }
        ));
    }
}
