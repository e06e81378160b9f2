pub mod backfill;
pub mod health;
pub mod standings;
pub mod winners;

use crate::db::Repository;
use crate::domain::CompetitionKind;
use crate::error::AppError;
use crate::orchestration::{BackfillService, WinnerDetermination};
use axum::{
    routing::{get, post},
    Router,
};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub determination: WinnerDetermination,
    pub backfill: BackfillService,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        determination: WinnerDetermination,
        backfill: BackfillService,
    ) -> Self {
        Self {
            repo,
            determination,
            backfill,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/standings", get(standings::get_standings))
        .route("/v1/winners", get(winners::get_winners))
        .route("/v1/winners/determine", post(winners::determine))
        .route("/v1/winners/determine-all", post(winners::determine_all))
        .route("/v1/backfill/preview", get(backfill::preview))
        .route("/v1/backfill/apply", post(backfill::apply))
        .route("/v1/backfill/check", get(backfill::check))
        .layer(cors)
        .with_state(state)
}

/// Parse the `competition` query value; absent defaults to the league.
pub(crate) fn parse_competition(input: Option<&str>) -> Result<CompetitionKind, AppError> {
    match input {
        None => Ok(CompetitionKind::League),
        Some(s) => CompetitionKind::from_str(s)
            .map_err(|_| AppError::BadRequest("competition must be league or cup".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn competition_defaults_to_league() {
        assert_eq!(parse_competition(None).unwrap(), CompetitionKind::League);
        assert_eq!(parse_competition(Some("cup")).unwrap(), CompetitionKind::Cup);
        assert!(parse_competition(Some("bowling")).is_err());
    }
}
