//! Errors surfaced by the allocator.

use thiserror::Error;

use seatpool_core::error::AppError;
use seatpool_core::types::{InvalidPolicy, PoolId};

/// Failure of an allocation or capacity read.
///
/// Every variant raised after the unit of work began implies it was rolled
/// back: no assignment rows were written and the pool lock was released.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// All-or-nothing request did not fit in the free seats.
    #[error("no capacity available: requested {requested}, available {available}")]
    CapacityExceeded {
        /// Eligible requesters after filtering existing holders.
        requested: u64,
        /// Free seats at evaluation time.
        available: u64,
    },

    /// The caller named a policy that does not exist.
    #[error(transparent)]
    InvalidPolicy(#[from] InvalidPolicy),

    /// The pool lock was not acquired within the configured wait.
    #[error("pool lock unavailable: {0}")]
    LockUnavailable(#[source] AppError),

    /// More live holders than seats were observed.
    #[error("capacity invariant violated for pool {pool}: {used} holders, {total} seats")]
    InvariantViolation {
        /// Pool in violation.
        pool: PoolId,
        /// Seats over active grants.
        total: u64,
        /// Distinct live holders.
        used: u64,
    },

    /// A storage read or write failed.
    #[error(transparent)]
    Storage(AppError),
}

impl AllocationError {
    /// Whether the same call may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. } | Self::LockUnavailable(_)
        )
    }
}

impl From<AppError> for AllocationError {
    fn from(err: AppError) -> Self {
        if err.is_lock_unavailable() {
            Self::LockUnavailable(err)
        } else {
            Self::Storage(err)
        }
    }
}

/// Flattens allocation failures for callers that only report errors.
impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Storage(inner) | AllocationError::LockUnavailable(inner) => inner,
            AllocationError::CapacityExceeded { .. } => AppError::conflict(err.to_string()),
            AllocationError::InvalidPolicy(_) => AppError::validation(err.to_string()),
            AllocationError::InvariantViolation { .. } => AppError::internal(err.to_string()),
        }
    }
}
