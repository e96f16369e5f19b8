//! Quote request status graph.
//!
//! ```text
//! pending -> contacted -> quoted -> approved -> completed
//!                                \-> rejected
//! ```
//!
//! Stages may be skipped forward (a request can be rejected straight from
//! `pending`), never moved backward. `completed` is only reachable from
//! `approved`; `rejected` and `completed` are terminal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Pending,
    Contacted,
    Quoted,
    Approved,
    Rejected,
    Completed,
}

/// All statuses, in pipeline order.
pub const ALL_STATUSES: &[QuoteStatus] = &[
    QuoteStatus::Pending,
    QuoteStatus::Contacted,
    QuoteStatus::Quoted,
    QuoteStatus::Approved,
    QuoteStatus::Rejected,
    QuoteStatus::Completed,
];

impl QuoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Contacted => "contacted",
            QuoteStatus::Quoted => "quoted",
            QuoteStatus::Approved => "approved",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Completed => "completed",
        }
    }

    fn stage(self) -> u8 {
        match self {
            QuoteStatus::Pending => 0,
            QuoteStatus::Contacted => 1,
            QuoteStatus::Quoted => 2,
            QuoteStatus::Approved | QuoteStatus::Rejected => 3,
            QuoteStatus::Completed => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, QuoteStatus::Rejected | QuoteStatus::Completed)
    }

    /// Whether a request in `self` may move to `next`. Re-setting the same
    /// status is always allowed.
    pub fn can_transition_to(self, next: QuoteStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() || next.stage() <= self.stage() {
            return false;
        }
        next != QuoteStatus::Completed || self == QuoteStatus::Approved
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_STATUSES
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = ALL_STATUSES.iter().map(|s| s.as_str()).collect();
                format!(
                    "Invalid quote status '{s}'. Must be one of: {}",
                    valid.join(", ")
                )
            })
    }
}

/// Validate a status change, returning a human-readable reason on failure.
pub fn validate_transition(from: QuoteStatus, to: QuoteStatus) -> Result<(), String> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(format!("Cannot move quote request from '{from}' to '{to}'"))
    }
}
