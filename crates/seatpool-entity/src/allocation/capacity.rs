//! Pool capacity figures.

use serde::{Deserialize, Serialize};

/// Total, consumed and free seats of one pool at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityDetails {
    /// Sum of seats over active grants.
    pub total: u64,
    /// Distinct requesters holding a live assignment.
    pub used: u64,
    /// `total - used`.
    pub available: u64,
}

impl CapacityDetails {
    /// Usage as a percentage of total; 0 for an empty pool.
    pub fn usage_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.used as f64 / self.total as f64) * 100.0
        }
    }
}
