//! Betting round status lifecycle.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle status of a betting round.
///
/// Rounds only ever move forward: `Open` -> `Scoring` -> `Scored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Open,
    Scoring,
    Scored,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Open => "open",
            RoundStatus::Scoring => "scoring",
            RoundStatus::Scored => "scored",
        }
    }

    /// Whether a transition to `next` moves the lifecycle forward.
    pub fn can_advance_to(&self, next: RoundStatus) -> bool {
        next > *self
    }
}

impl FromStr for RoundStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(RoundStatus::Open),
            "scoring" => Ok(RoundStatus::Scoring),
            "scored" => Ok(RoundStatus::Scored),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
