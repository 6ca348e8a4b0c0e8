//! Keyed mutex table for pool locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use seatpool_core::error::AppError;
use seatpool_core::types::PoolLockKey;

/// One slot per key that is held or awaited.
#[derive(Debug)]
struct Slot {
    /// The lock itself.
    mutex: Arc<AsyncMutex<()>>,
    /// Holders plus waiters. The slot is removed when this reaches zero.
    refs: usize,
}

/// Table of exclusive locks keyed by [`PoolLockKey`].
///
/// Entries exist only while some unit of work holds or waits for the key,
/// so the table does not grow with the number of pools ever touched.
#[derive(Debug, Default)]
pub struct PoolLockTable {
    slots: Mutex<HashMap<PoolLockKey, Slot>>,
}

impl PoolLockTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the lock on `key`.
    ///
    /// With `timeout` set, gives up after that long with a
    /// lock-unavailable error. Dropping the returned future before it
    /// resolves leaves the table as if it had never been called.
    pub async fn acquire(
        self: &Arc<Self>,
        key: PoolLockKey,
        timeout: Option<Duration>,
    ) -> Result<PoolLockGuard, AppError> {
        let mutex = self.checkout(key);
        let mut guard = PoolLockGuard {
            table: Arc::clone(self),
            key,
            held: None,
        };

        let held = match timeout {
            None => mutex.lock_owned().await,
            Some(limit) => tokio::time::timeout(limit, mutex.lock_owned())
                .await
                .map_err(|_| {
                    AppError::lock_unavailable(format!(
                        "Timed out after {}ms waiting for pool lock {key}",
                        limit.as_millis()
                    ))
                })?,
        };

        debug!(key = %key, "Pool lock acquired");
        guard.held = Some(held);
        Ok(guard)
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn checkout(&self, key: PoolLockKey) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(key).or_insert_with(|| Slot {
            mutex: Arc::new(AsyncMutex::new(())),
            refs: 0,
        });
        slot.refs += 1;
        Arc::clone(&slot.mutex)
    }

    fn release(&self, key: PoolLockKey) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(&key) {
            slot.refs -= 1;
            if slot.refs == 0 {
                slots.remove(&key);
            }
        }
    }
}

/// Holds (or is waiting for) one key of a [`PoolLockTable`].
///
/// Dropping the guard unlocks the key and returns its table reference.
#[derive(Debug)]
pub struct PoolLockGuard {
    table: Arc<PoolLockTable>,
    key: PoolLockKey,
    held: Option<OwnedMutexGuard<()>>,
}

impl PoolLockGuard {
    /// The key this guard is for.
    pub fn key(&self) -> PoolLockKey {
        self.key
    }
}

impl Drop for PoolLockGuard {
    fn drop(&mut self) {
        if self.held.take().is_some() {
            debug!(key = %self.key, "Pool lock released");
        }
        self.table.release(self.key);
    }
}
