//! Standings value types.

use serde::Serialize;

use super::UserId;

/// One user's aggregated point total for a ranking scope.
///
/// This is the input shape of the standings ranker: one row per user, with
/// the points already summed for the requested season/competition kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPointTotal {
    pub user_id: UserId,
    pub username: String,
    pub points: i64,
}

/// One row of a ranked leaderboard.
///
/// Ranks follow standard competition ("1224") semantics: tied entries share
/// a rank and the next distinct points value resumes at its positional rank.
/// `is_tied` is true whenever at least one other entry holds the same points
/// value, so callers never have to recompute tie groups themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsEntry {
    pub user_id: UserId,
    pub username: String,
    pub points: i64,
    pub rank: i64,
    pub is_tied: bool,
}
