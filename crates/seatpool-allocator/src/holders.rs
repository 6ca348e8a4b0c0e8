//! Live holder lookup and the idempotency filter.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use seatpool_core::traits::{AllocationStore, UnitOfWork};
use seatpool_core::types::{PoolId, RequesterId};

use crate::error::AllocationError;

/// Requesters holding a live seat in `pool` at `now`.
pub async fn live_holders(
    uow: &mut dyn UnitOfWork,
    pool: &PoolId,
    now: DateTime<Utc>,
) -> Result<HashSet<RequesterId>, AllocationError> {
    Ok(uow.live_holder_ids(pool, now).await?)
}

/// `requested` minus current live holders, in input order.
///
/// Repeated entries keep only their first occurrence.
pub async fn filter_new_requesters(
    uow: &mut dyn UnitOfWork,
    pool: &PoolId,
    now: DateTime<Utc>,
    requested: &[RequesterId],
) -> Result<Vec<RequesterId>, AllocationError> {
    let mut seen = live_holders(uow, pool, now).await?;
    Ok(requested
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect())
}

/// [`live_holders`] in a dedicated read-only snapshot.
pub async fn read_live_holders(
    store: &dyn AllocationStore,
    pool: &PoolId,
    now: DateTime<Utc>,
) -> Result<HashSet<RequesterId>, AllocationError> {
    let mut uow = store.begin_read_snapshot().await?;
    let result = live_holders(uow.as_mut(), pool, now).await;
    uow.rollback().await?;
    result
}
