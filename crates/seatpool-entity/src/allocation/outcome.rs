//! Allocation results.

use std::fmt;

use serde::{Deserialize, Serialize};

use seatpool_core::types::RequesterId;

/// How much of an allocation request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOutcome {
    /// Every eligible requester got a seat (including the case of none eligible).
    Full,
    /// Some, but not all, eligible requesters got a seat.
    Partial,
    /// Requesters were eligible but no seat was free.
    NoCapacity,
}

impl AssignOutcome {
    /// Classify `assigned` seats handed out against `requested` eligible requesters.
    pub fn classify(assigned: usize, requested: usize) -> Self {
        if assigned == requested {
            Self::Full
        } else if assigned == 0 {
            Self::NoCapacity
        } else {
            Self::Partial
        }
    }

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
            Self::NoCapacity => "no_capacity",
        }
    }
}

impl fmt::Display for AssignOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an allocation call did.
///
/// `assigned` and `overflow` are disjoint and together are exactly the
/// eligible requesters, both in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignResult {
    /// Requesters that received a seat in this call.
    pub assigned: Vec<RequesterId>,
    /// Eligible requesters that did not receive a seat.
    pub overflow: Vec<RequesterId>,
    /// Summary of the two lists.
    pub outcome: AssignOutcome,
}

impl AssignResult {
    /// Result for a call that had nothing to do.
    pub fn empty() -> Self {
        Self {
            assigned: Vec::new(),
            overflow: Vec::new(),
            outcome: AssignOutcome::Full,
        }
    }

    /// Split `eligible` after its first `take` entries.
    pub fn split(mut eligible: Vec<RequesterId>, take: usize) -> Self {
        let requested = eligible.len();
        let overflow = eligible.split_off(take.min(requested));
        let outcome = AssignOutcome::classify(eligible.len(), requested);
        Self {
            assigned: eligible,
            overflow,
            outcome,
        }
    }
}
