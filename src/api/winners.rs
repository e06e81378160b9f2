use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{parse_competition, AppState};
use crate::domain::{SeasonId, WinnerRecord};
use crate::error::AppError;
use crate::orchestration::{DeterminationOutcome, SeasonSweep};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnersQuery {
    pub season_id: i64,
    pub competition: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepQuery {
    pub competition: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRow {
    pub user_id: i64,
    pub total_points: i64,
    pub rank: i64,
    pub determined_at: i64,
}

impl From<WinnerRecord> for WinnerRow {
    fn from(record: WinnerRecord) -> Self {
        WinnerRow {
            user_id: record.user_id.as_i64(),
            total_points: record.total_points,
            rank: record.rank,
            determined_at: record.determined_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeterminationResponse {
    pub season_id: i64,
    pub competition: String,
    pub already_determined: bool,
    pub winners: Vec<WinnerRow>,
}

impl From<DeterminationOutcome> for DeterminationResponse {
    fn from(outcome: DeterminationOutcome) -> Self {
        DeterminationResponse {
            season_id: outcome.season_id.as_i64(),
            competition: outcome.kind.as_str().to_string(),
            already_determined: outcome.already_determined,
            winners: outcome.winners.into_iter().map(WinnerRow::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepErrorRow {
    pub season_id: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub determined: Vec<DeterminationResponse>,
    pub errors: Vec<SweepErrorRow>,
}

impl From<SeasonSweep> for SweepResponse {
    fn from(sweep: SeasonSweep) -> Self {
        SweepResponse {
            determined: sweep
                .determined
                .into_iter()
                .map(DeterminationResponse::from)
                .collect(),
            errors: sweep
                .errors
                .into_iter()
                .map(|e| SweepErrorRow {
                    season_id: e.season_id.as_i64(),
                    message: e.message,
                })
                .collect(),
        }
    }
}

/// Read the committed winner set for a season; empty when undetermined.
pub async fn get_winners(
    Query(params): Query<WinnersQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<WinnerRow>>, AppError> {
    let kind = parse_competition(params.competition.as_deref())?;

    let winners = state
        .repo
        .list_existing_winners(SeasonId::new(params.season_id), kind)
        .await?;

    Ok(Json(winners.into_iter().map(WinnerRow::from).collect()))
}

pub async fn determine(
    Query(params): Query<WinnersQuery>,
    State(state): State<AppState>,
) -> Result<Json<DeterminationResponse>, AppError> {
    let kind = parse_competition(params.competition.as_deref())?;

    let outcome = state
        .determination
        .determine_winners(SeasonId::new(params.season_id), kind)
        .await?;

    Ok(Json(outcome.into()))
}

pub async fn determine_all(
    Query(params): Query<SweepQuery>,
    State(state): State<AppState>,
) -> Result<Json<SweepResponse>, AppError> {
    let kind = parse_competition(params.competition.as_deref())?;

    let sweep = state.determination.determine_for_eligible_seasons(kind).await?;
    Ok(Json(sweep.into()))
}
