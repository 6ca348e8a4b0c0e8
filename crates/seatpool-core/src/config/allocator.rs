//! Seat allocation configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::policy::AllocationPolicy;

/// Seat allocator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Upper bound on how long an allocation waits for its pool lock.
    ///
    /// Absent means wait until the lock is free.
    #[serde(default)]
    pub lock_timeout_ms: Option<u64>,
    /// Policy used when a caller does not name one.
    #[serde(default)]
    pub default_policy: AllocationPolicy,
}

impl AllocatorConfig {
    /// The lock wait bound as a [`Duration`], if configured.
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }
}
