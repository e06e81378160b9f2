use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{CompetitionContext, CompetitionId, UserId};
use crate::error::AppError;
use crate::orchestration::{BackfillCheck, BackfillOutcome, RoundBackfillPlan};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    pub user_id: i64,
    pub competition_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub user_id: i64,
    pub competition_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckQuery {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundPlanRow {
    pub round_id: i64,
    pub round_name: String,
    pub points_awarded: i64,
    pub minimum_participant_score: i64,
    pub participant_count: usize,
}

impl From<RoundBackfillPlan> for RoundPlanRow {
    fn from(plan: RoundBackfillPlan) -> Self {
        RoundPlanRow {
            round_id: plan.round_id.as_i64(),
            round_name: plan.round_name,
            points_awarded: plan.points_awarded,
            minimum_participant_score: plan.minimum_participant_score,
            participant_count: plan.participant_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillResponse {
    pub user_id: i64,
    pub dry_run: bool,
    pub rounds_processed: usize,
    pub total_points_awarded: i64,
    pub rounds: Vec<RoundPlanRow>,
    pub errors: Vec<String>,
}

impl From<BackfillOutcome> for BackfillResponse {
    fn from(outcome: BackfillOutcome) -> Self {
        BackfillResponse {
            user_id: outcome.user_id.as_i64(),
            dry_run: outcome.dry_run,
            rounds_processed: outcome.rounds_processed,
            total_points_awarded: outcome.total_points_awarded,
            rounds: outcome.rounds.into_iter().map(RoundPlanRow::from).collect(),
            errors: outcome.errors,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub user_id: i64,
    pub needs_backfill: bool,
    pub missed_rounds: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competition: Option<CompetitionContext>,
}

impl From<BackfillCheck> for CheckResponse {
    fn from(check: BackfillCheck) -> Self {
        CheckResponse {
            user_id: check.user_id.as_i64(),
            needs_backfill: check.needs_backfill,
            missed_rounds: check.missed_rounds,
            competition: check.competition,
        }
    }
}

pub async fn preview(
    Query(params): Query<PreviewQuery>,
    State(state): State<AppState>,
) -> Result<Json<BackfillResponse>, AppError> {
    let outcome = state
        .backfill
        .preview_for_user(
            UserId::new(params.user_id),
            params.competition_id.map(CompetitionId::new),
        )
        .await?;

    Ok(Json(outcome.into()))
}

pub async fn apply(
    State(state): State<AppState>,
    Json(body): Json<ApplyRequest>,
) -> Result<Json<BackfillResponse>, AppError> {
    let outcome = state
        .backfill
        .apply_for_user(
            UserId::new(body.user_id),
            body.competition_id.map(CompetitionId::new),
            false,
        )
        .await?;

    Ok(Json(outcome.into()))
}

pub async fn check(
    Query(params): Query<CheckQuery>,
    State(state): State<AppState>,
) -> Result<Json<CheckResponse>, AppError> {
    let check = state
        .backfill
        .check_if_user_needs_backfill(UserId::new(params.user_id))
        .await?;

    Ok(Json(check.into()))
}
