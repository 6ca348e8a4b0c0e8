//! Lock key derivation for pools.
//!
//! The key is `SHA-256("{tenant}:{resource}") mod (2^31 - 1)`, reading the
//! digest as a big-endian integer. Identifiers use their canonical
//! lowercase hyphenated form, so the key is stable across processes and
//! hosts.

use sha2::{Digest, Sha256};

use seatpool_core::types::{PoolId, PoolLockKey, ResourceId, TenantId};

/// Derive the lock key for the pool `(tenant_id, resource_id)`.
pub fn derive(tenant_id: &TenantId, resource_id: &ResourceId) -> PoolLockKey {
    let mut hasher = Sha256::new();
    hasher.update(tenant_id.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(resource_id.to_string().as_bytes());
    let digest = hasher.finalize();

    let modulus = u64::from(PoolLockKey::MODULUS);
    let reduced = digest
        .iter()
        .fold(0u64, |acc, byte| ((acc << 8) | u64::from(*byte)) % modulus);

    PoolLockKey::reduce(reduced)
}

/// Derive the lock key for `pool`.
pub fn derive_for(pool: &PoolId) -> PoolLockKey {
    derive(&pool.tenant_id, &pool.resource_id)
}
