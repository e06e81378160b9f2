//! Competition kind and resolved competition context.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{CompetitionId, SeasonId};

/// The two season-scoped competitions a point ledger is kept for.
///
/// `League` is the main season-long competition; `Cup` is the secondary
/// last-round-special competition that a season may opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionKind {
    League,
    Cup,
}

impl CompetitionKind {
    /// Canonical lowercase form, used both on the wire and in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitionKind::League => "league",
            CompetitionKind::Cup => "cup",
        }
    }
}

impl FromStr for CompetitionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "league" => Ok(CompetitionKind::League),
            "cup" => Ok(CompetitionKind::Cup),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for CompetitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved (competition, season) pair for a user-facing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionContext {
    pub competition_id: CompetitionId,
    pub season_id: SeasonId,
    pub competition_name: String,
}
