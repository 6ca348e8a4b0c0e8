//! The seat allocation operation.
//!
//! One call runs inside one unit of work:
//!
//! 1. Begin the unit of work.
//! 2. Take the pool's exclusive lock (released by commit or rollback).
//! 3. Drop requesters that already hold a live seat.
//! 4. Evaluate free seats.
//! 5. Apply the policy.
//! 6. Bulk-insert the new assignments.
//! 7. Commit.
//!
//! Any failure after step 1 rolls back, so no rows are written and the
//! lock is released.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use seatpool_core::traits::{AllocationStore, UnitOfWork};
use seatpool_core::types::{AllocationPolicy, PoolId, RequesterId, ResourceId, TenantId};
use seatpool_entity::allocation::{AssignResult, CapacityDetails};

use crate::capacity;
use crate::error::AllocationError;
use crate::events::{AllocationEvent, AllocationEventSink, TracingEventSink};
use crate::holders;
use crate::pool_key;

/// Input of [`Allocator::assign`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignRequest {
    /// Target pool.
    pub pool: PoolId,
    /// Requesters to seat, in priority order for partial fills.
    pub requesters: Vec<RequesterId>,
    /// What to do when they do not all fit.
    pub policy: AllocationPolicy,
}

impl AssignRequest {
    /// Build a request for the pool `(tenant_id, resource_id)`.
    pub fn new(
        tenant_id: TenantId,
        resource_id: ResourceId,
        requesters: Vec<RequesterId>,
        policy: AllocationPolicy,
    ) -> Self {
        Self {
            pool: PoolId::new(tenant_id, resource_id),
            requesters,
            policy,
        }
    }
}

/// Assigns seats from pools without ever oversubscribing them.
///
/// Calls on the same pool are serialized through the store's pool lock;
/// calls on different pools run independently. The allocator keeps no
/// state between calls.
#[derive(Debug, Clone)]
pub struct Allocator {
    /// Storage the units of work are opened against.
    store: Arc<dyn AllocationStore>,
    /// Receiver of per-step events.
    events: Arc<dyn AllocationEventSink>,
}

impl Allocator {
    /// Creates a new allocator.
    pub fn new(store: Arc<dyn AllocationStore>, events: Arc<dyn AllocationEventSink>) -> Self {
        Self { store, events }
    }

    /// Creates an allocator that reports events through `tracing`.
    pub fn with_tracing(store: Arc<dyn AllocationStore>) -> Self {
        Self::new(store, Arc::new(TracingEventSink))
    }

    /// Assign seats evaluated at the current time.
    pub async fn assign(&self, request: &AssignRequest) -> Result<AssignResult, AllocationError> {
        self.assign_at(request, Utc::now()).await
    }

    /// Assign seats with grants and holders evaluated at `now`.
    ///
    /// An empty requester list succeeds without touching storage.
    pub async fn assign_at(
        &self,
        request: &AssignRequest,
        now: DateTime<Utc>,
    ) -> Result<AssignResult, AllocationError> {
        let pool = request.pool;
        self.emit(AllocationEvent::Started {
            pool,
            requested: request.requesters.len(),
            policy: request.policy,
        });

        if request.requesters.is_empty() {
            let result = AssignResult::empty();
            self.emit_success(&pool, &result);
            return Ok(result);
        }

        let mut uow = self.store.begin().await?;

        let outcome = self.run(uow.as_mut(), request, now).await;
        match outcome {
            Ok(result) => {
                uow.commit().await?;
                self.emit_success(&pool, &result);
                Ok(result)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(
                        pool = %pool,
                        error = %rollback_err,
                        "Rollback after failed allocation also failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// Current capacity of `pool`, read from one snapshot.
    pub async fn pool_details(&self, pool: &PoolId) -> Result<CapacityDetails, AllocationError> {
        capacity::read_details(self.store.as_ref(), pool, Utc::now()).await
    }

    /// Steps 2 to 6, inside an open unit of work.
    async fn run(
        &self,
        uow: &mut dyn UnitOfWork,
        request: &AssignRequest,
        now: DateTime<Utc>,
    ) -> Result<AssignResult, AllocationError> {
        let pool = request.pool;
        let key = pool_key::derive_for(&pool);

        uow.lock_pool(key).await?;
        debug!(pool = %pool, key = %key, "Pool lock held");

        let eligible =
            holders::filter_new_requesters(uow, &pool, now, &request.requesters).await?;
        self.emit(AllocationEvent::Filtered {
            pool,
            requested: request.requesters.len(),
            eligible: eligible.len(),
            filtered_out: request.requesters.len() - eligible.len(),
        });

        let details = capacity::details(uow, &pool, now).await?;
        let requested = eligible.len() as u64;
        self.emit(AllocationEvent::CapacityChecked {
            pool,
            total: details.total,
            used: details.used,
            available: details.available,
            requested,
        });

        let take = match request.policy {
            AllocationPolicy::AllOrNothing => {
                if requested > details.available {
                    self.emit(AllocationEvent::CapacityRejected {
                        pool,
                        requested,
                        available: details.available,
                    });
                    return Err(AllocationError::CapacityExceeded {
                        requested,
                        available: details.available,
                    });
                }
                eligible.len()
            }
            AllocationPolicy::PartialFill => {
                usize::try_from(details.available).map_or(eligible.len(), |free| {
                    free.min(eligible.len())
                })
            }
        };

        let result = AssignResult::split(eligible, take);
        if !result.assigned.is_empty() {
            uow.insert_assignments(&pool, &result.assigned, now).await?;
        }

        Ok(result)
    }

    fn emit_success(&self, pool: &PoolId, result: &AssignResult) {
        self.emit(AllocationEvent::Succeeded {
            pool: *pool,
            assigned: result.assigned.len(),
            overflow: result.overflow.len(),
            outcome: result.outcome,
        });
    }

    fn emit(&self, event: AllocationEvent) {
        if let Err(e) = self.events.emit(&event) {
            warn!(event = event.name(), error = %e, "Allocation event sink failed");
        }
    }
}
