//! Pool identity and the integer key used to serialize allocations on it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{ResourceId, TenantId};

/// The (tenant, resource) scope over which capacity and holders are evaluated.
///
/// A pool is not stored on its own; it is the grouping shared by grant and
/// assignment rows with the same tenant and resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Licensed resource.
    pub resource_id: ResourceId,
}

impl PoolId {
    /// Create a pool identity from its two components.
    pub fn new(tenant_id: TenantId, resource_id: ResourceId) -> Self {
        Self {
            tenant_id,
            resource_id,
        }
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tenant_id, self.resource_id)
    }
}

/// Exclusive lock identifier for a pool, in `[0, 2^31 - 2]`.
///
/// Distinct pools may share a key; that only adds serialization; it never
/// mixes up capacity, which is always evaluated by full [`PoolId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolLockKey(u32);

impl PoolLockKey {
    /// Exclusive upper bound of the key space (`2^31 - 1`).
    pub const MODULUS: u32 = (1 << 31) - 1;

    /// Wrap a raw key, rejecting values outside the key space.
    pub fn new(value: u32) -> Option<Self> {
        (value < Self::MODULUS).then_some(Self(value))
    }

    /// Reduce an arbitrary value into the key space.
    pub fn reduce(value: u64) -> Self {
        Self((value % u64::from(Self::MODULUS)) as u32)
    }

    /// The raw key value.
    pub fn value(self) -> u32 {
        self.0
    }

    /// The key widened for `pg_advisory_xact_lock(bigint)`.
    pub fn as_i64(self) -> i64 {
        i64::from(self.0)
    }
}

impl fmt::Display for PoolLockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
