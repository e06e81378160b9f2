use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{parse_competition, AppState};
use crate::domain::{SeasonId, StandingsEntry};
use crate::engine::rank_standings;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsQuery {
    pub season_id: i64,
    pub competition: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsRow {
    pub user_id: i64,
    pub username: String,
    pub points: i64,
    pub rank: i64,
    pub is_tied: bool,
}

impl From<StandingsEntry> for StandingsRow {
    fn from(entry: StandingsEntry) -> Self {
        StandingsRow {
            user_id: entry.user_id.as_i64(),
            username: entry.username,
            points: entry.points,
            rank: entry.rank,
            is_tied: entry.is_tied,
        }
    }
}

/// Standings are never persisted; every request ranks the current ledger.
pub async fn get_standings(
    Query(params): Query<StandingsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StandingsRow>>, AppError> {
    let kind = parse_competition(params.competition.as_deref())?;

    let totals = state
        .repo
        .list_user_point_totals(SeasonId::new(params.season_id), kind)
        .await?;

    let entries = rank_standings(totals);
    Ok(Json(entries.into_iter().map(StandingsRow::from).collect()))
}
