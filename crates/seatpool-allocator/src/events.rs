//! Structured allocation events.
//!
//! The allocator emits one event per algorithm step through an injected
//! [`AllocationEventSink`]. Sink failures are logged and otherwise ignored;
//! they never change an allocation's outcome.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use seatpool_core::result::AppResult;
use seatpool_core::types::{AllocationPolicy, PoolId};
use seatpool_entity::allocation::AssignOutcome;

/// One step of an allocation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AllocationEvent {
    /// A call started.
    Started {
        /// Target pool.
        pool: PoolId,
        /// Requesters named by the caller.
        requested: usize,
        /// Policy in force.
        policy: AllocationPolicy,
    },
    /// Existing holders were removed from the request.
    Filtered {
        /// Target pool.
        pool: PoolId,
        /// Requesters named by the caller.
        requested: usize,
        /// Requesters left after filtering.
        eligible: usize,
        /// Requesters dropped as existing holders or duplicates.
        filtered_out: usize,
    },
    /// Capacity was evaluated under the pool lock.
    CapacityChecked {
        /// Target pool.
        pool: PoolId,
        /// Seats over active grants.
        total: u64,
        /// Distinct live holders.
        used: u64,
        /// Free seats.
        available: u64,
        /// Eligible requesters.
        requested: u64,
    },
    /// An all-or-nothing request was rejected.
    CapacityRejected {
        /// Target pool.
        pool: PoolId,
        /// Eligible requesters.
        requested: u64,
        /// Free seats.
        available: u64,
    },
    /// The unit of work committed.
    Succeeded {
        /// Target pool.
        pool: PoolId,
        /// Seats handed out.
        assigned: usize,
        /// Eligible requesters left without a seat.
        overflow: usize,
        /// Summary.
        outcome: AssignOutcome,
    },
}

impl AllocationEvent {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Filtered { .. } => "filtered",
            Self::CapacityChecked { .. } => "capacity_checked",
            Self::CapacityRejected { .. } => "capacity_rejected",
            Self::Succeeded { .. } => "succeeded",
        }
    }
}

/// Receiver of allocation events.
pub trait AllocationEventSink: Send + Sync + std::fmt::Debug {
    /// Record one event.
    fn emit(&self, event: &AllocationEvent) -> AppResult<()>;
}

/// Writes events to `tracing` under the `seatpool::allocation` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl AllocationEventSink for TracingEventSink {
    fn emit(&self, event: &AllocationEvent) -> AppResult<()> {
        match event {
            AllocationEvent::Started {
                pool,
                requested,
                policy,
            } => info!(
                target: "seatpool::allocation",
                pool = %pool,
                requested,
                policy = %policy,
                "Allocation started"
            ),
            AllocationEvent::Filtered {
                pool,
                requested,
                eligible,
                filtered_out,
            } => info!(
                target: "seatpool::allocation",
                pool = %pool,
                requested,
                eligible,
                filtered_out,
                "Existing holders filtered"
            ),
            AllocationEvent::CapacityChecked {
                pool,
                total,
                used,
                available,
                requested,
            } => info!(
                target: "seatpool::allocation",
                pool = %pool,
                total,
                used,
                available,
                requested,
                "Capacity checked"
            ),
            AllocationEvent::CapacityRejected {
                pool,
                requested,
                available,
            } => warn!(
                target: "seatpool::allocation",
                pool = %pool,
                requested,
                available,
                "Allocation rejected: insufficient capacity"
            ),
            AllocationEvent::Succeeded {
                pool,
                assigned,
                overflow,
                outcome,
            } => info!(
                target: "seatpool::allocation",
                pool = %pool,
                assigned,
                overflow,
                outcome = %outcome,
                "Allocation committed"
            ),
        }
        Ok(())
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<AllocationEvent>>,
}

impl RecordingEventSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events.
    pub fn events(&self) -> Vec<AllocationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of all recorded events.
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(AllocationEvent::name)
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl AllocationEventSink for RecordingEventSink {
    fn emit(&self, event: &AllocationEvent) -> AppResult<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
