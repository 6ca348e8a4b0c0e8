//! Grant entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use seatpool_core::types::{PoolId, ResourceId, TenantId};

/// A time-bounded allotment of seats to a pool.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Grant {
    /// Unique grant identifier.
    pub id: Uuid,
    /// Tenant that owns the pool.
    pub tenant_id: Uuid,
    /// Resource the seats are for.
    pub resource_id: Uuid,
    /// Number of seats this grant contributes while active.
    pub seat_count: i32,
    /// Start of the validity window.
    pub issued_at: DateTime<Utc>,
    /// End of the validity window (exclusive).
    pub expires_at: DateTime<Utc>,
    /// When the row was written.
    pub created_at: DateTime<Utc>,
}

impl Grant {
    /// The pool this grant belongs to.
    pub fn pool(&self) -> PoolId {
        PoolId::new(
            TenantId::from_uuid(self.tenant_id),
            ResourceId::from_uuid(self.resource_id),
        )
    }

    /// Whether the grant contributes seats at `now`.
    ///
    /// Only the upper bound is checked; a grant issued in the future still
    /// counts, matching the storage queries.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
