//! Assignment entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use seatpool_core::types::{PoolId, RequesterId, ResourceId, TenantId};

/// A seat held by one requester in one pool.
///
/// Unique per (tenant, resource, requester). Rows outlive the grants that
/// made them live; they go dormant when no grant is active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    /// Unique assignment identifier.
    pub id: Uuid,
    /// Tenant that owns the pool.
    pub tenant_id: Uuid,
    /// Resource the seat is for.
    pub resource_id: Uuid,
    /// Holder of the seat.
    pub requester_id: Uuid,
    /// When the seat was assigned.
    pub assigned_at: DateTime<Utc>,
}

impl Assignment {
    /// Build a new row for `requester` in `pool`.
    pub fn new(pool: &PoolId, requester: RequesterId, assigned_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: pool.tenant_id.into_uuid(),
            resource_id: pool.resource_id.into_uuid(),
            requester_id: requester.into_uuid(),
            assigned_at,
        }
    }

    /// The pool this assignment belongs to.
    pub fn pool(&self) -> PoolId {
        PoolId::new(
            TenantId::from_uuid(self.tenant_id),
            ResourceId::from_uuid(self.resource_id),
        )
    }

    /// The holder as a typed identifier.
    pub fn requester(&self) -> RequesterId {
        RequesterId::from_uuid(self.requester_id)
    }
}
