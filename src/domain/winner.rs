//! Persisted winner records.

use serde::Serialize;

use super::{CompetitionKind, SeasonId, UserId};

/// A durably recorded season outcome for one winning user.
///
/// For a given (season, kind) key either no rows exist (undetermined) or a
/// complete set exists: one row per winner, every row rank 1 with the same
/// total. The rows themselves are the idempotency marker; there is no
/// separate "determined" flag anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    pub season_id: SeasonId,
    pub kind: CompetitionKind,
    pub user_id: UserId,
    pub total_points: i64,
    pub rank: i64,
    pub determined_at: i64,
}
