//! Allocation policy selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How an allocation behaves when there are fewer free seats than eligible requesters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// Reject the whole request if it does not fit.
    #[default]
    AllOrNothing,
    /// Grant as many as fit, in input order, and report the rest as overflow.
    PartialFill,
}

impl AllocationPolicy {
    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllOrNothing => "all_or_nothing",
            Self::PartialFill => "partial_fill",
        }
    }
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A policy name that does not match any [`AllocationPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown allocation policy '{0}' (expected 'all_or_nothing' or 'partial_fill')")]
pub struct InvalidPolicy(pub String);

impl FromStr for AllocationPolicy {
    type Err = InvalidPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all_or_nothing" => Ok(Self::AllOrNothing),
            "partial_fill" | "partial" => Ok(Self::PartialFill),
            _ => Err(InvalidPolicy(s.to_string())),
        }
    }
}
