//! Retroactive point backfill for late-joining users.

use crate::db::repo::{NewUserBet, RoundRef};
use crate::db::Repository;
use crate::domain::{CompetitionContext, CompetitionId, RoundId, UserId};
use crate::engine::fair_share;
use futures::future::try_join;
use std::sync::Arc;
use thiserror::Error;

/// Applies (or previews) fair-share backfills across a user's missed rounds.
#[derive(Clone)]
pub struct BackfillService {
    repo: Arc<Repository>,
}

/// The committed (or planned, in dry-run mode) backfill for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundBackfillPlan {
    pub round_id: RoundId,
    pub round_name: String,
    pub points_awarded: i64,
    pub minimum_participant_score: i64,
    pub participant_count: usize,
}

/// Aggregate result of a backfill run.
///
/// A failed round contributes one message to `errors` and nothing else;
/// sibling rounds are unaffected either way.
#[derive(Debug, Clone)]
pub struct BackfillOutcome {
    pub user_id: UserId,
    pub dry_run: bool,
    pub rounds_processed: usize,
    pub total_points_awarded: i64,
    pub rounds: Vec<RoundBackfillPlan>,
    pub errors: Vec<String>,
}

impl BackfillOutcome {
    fn empty(user_id: UserId, dry_run: bool) -> Self {
        Self {
            user_id,
            dry_run,
            rounds_processed: 0,
            total_points_awarded: 0,
            rounds: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Whether any backfill action is warranted for a user right now.
#[derive(Debug, Clone)]
pub struct BackfillCheck {
    pub user_id: UserId,
    pub needs_backfill: bool,
    pub missed_rounds: usize,
    pub competition: Option<CompetitionContext>,
}

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl BackfillService {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Backfill every missed round for a user.
    ///
    /// The user must exist; an unknown id fails before any work happens.
    /// Without an explicit competition the current one is resolved, and no
    /// resolvable competition simply means nothing to do. Rounds are
    /// processed in ascending id order; in live mode each round's bets are
    /// written in one transaction, in dry-run mode nothing is written at
    /// all. A failing round is collected and the rest continue.
    pub async fn apply_for_user(
        &self,
        user_id: UserId,
        competition_id: Option<CompetitionId>,
        dry_run: bool,
    ) -> Result<BackfillOutcome, BackfillError> {
        if self.repo.find_user(user_id).await?.is_none() {
            return Err(BackfillError::UserNotFound(user_id));
        }

        let competition_id = match competition_id {
            Some(id) => id,
            None => match self.repo.get_competition_context(None).await? {
                Some(ctx) => ctx.competition_id,
                None => {
                    tracing::info!(user_id = %user_id, "no current competition; nothing to backfill");
                    return Ok(BackfillOutcome::empty(user_id, dry_run));
                }
            },
        };

        let missed = self
            .repo
            .list_scored_rounds_without_user_bet(user_id, competition_id)
            .await?;

        let mut outcome = BackfillOutcome::empty(user_id, dry_run);
        for round in &missed {
            match self.process_round(user_id, round, dry_run).await {
                Ok(plan) => {
                    outcome.rounds_processed += 1;
                    outcome.total_points_awarded += plan.points_awarded;
                    outcome.rounds.push(plan);
                }
                Err(message) => {
                    tracing::warn!(user_id = %user_id, round_id = %round.round_id, error = %message, "round backfill failed; continuing with remaining rounds");
                    outcome.errors.push(message);
                }
            }
        }

        if !dry_run && outcome.rounds_processed > 0 {
            tracing::info!(
                user_id = %user_id,
                competition_id = %competition_id,
                rounds = outcome.rounds_processed,
                points = outcome.total_points_awarded,
                "backfill applied"
            );
        }

        Ok(outcome)
    }

    /// Read-only preview of `apply_for_user`; safe to call repeatedly.
    pub async fn preview_for_user(
        &self,
        user_id: UserId,
        competition_id: Option<CompetitionId>,
    ) -> Result<BackfillOutcome, BackfillError> {
        self.apply_for_user(user_id, competition_id, true).await
    }

    /// Combine a preview with the current competition context to report
    /// whether any backfill action is warranted for the user.
    pub async fn check_if_user_needs_backfill(
        &self,
        user_id: UserId,
    ) -> Result<BackfillCheck, BackfillError> {
        if self.repo.find_user(user_id).await?.is_none() {
            return Err(BackfillError::UserNotFound(user_id));
        }

        let Some(context) = self.repo.get_competition_context(None).await? else {
            return Ok(BackfillCheck {
                user_id,
                needs_backfill: false,
                missed_rounds: 0,
                competition: None,
            });
        };

        let preview = self
            .apply_for_user(user_id, Some(context.competition_id), true)
            .await?;
        let missed_rounds = preview.rounds_processed + preview.errors.len();

        Ok(BackfillCheck {
            user_id,
            needs_backfill: missed_rounds > 0,
            missed_rounds,
            competition: Some(context),
        })
    }

    /// True iff the user has no bet anywhere in the competition's rounds.
    ///
    /// Callers use this to tell a genuinely new participant apart from one
    /// who is mid-competition and skipped a round by choice.
    pub async fn is_user_first_bet_in_competition(
        &self,
        user_id: UserId,
        competition_id: CompetitionId,
    ) -> Result<bool, BackfillError> {
        let count = self
            .repo
            .count_user_bets_in_competition(user_id, competition_id)
            .await?;
        Ok(count == 0)
    }

    async fn process_round(
        &self,
        user_id: UserId,
        round: &RoundRef,
        dry_run: bool,
    ) -> Result<RoundBackfillPlan, String> {
        let (fixtures, totals) = try_join(
            self.repo.list_round_fixtures(round.round_id),
            self.repo.list_existing_participant_totals(round.round_id),
        )
        .await
        .map_err(|e| round_error(round, &e.to_string()))?;

        let share = fair_share(&totals, &fixtures);
        if !share.is_exact() {
            return Err(round_error(
                round,
                &format!(
                    "cannot distribute {} points across {} fixtures",
                    share.minimum_participant_score,
                    fixtures.len()
                ),
            ));
        }

        if !dry_run {
            let submitted_at = chrono::Utc::now().timestamp_millis();
            let bets: Vec<NewUserBet> = share
                .fixture_points
                .iter()
                .map(|fp| NewUserBet {
                    user_id,
                    fixture_id: fp.fixture_id,
                    points_awarded: fp.points,
                    submitted_at,
                })
                .collect();

            self.repo
                .insert_user_bets(&bets)
                .await
                .map_err(|e| round_error(round, &e.to_string()))?;
        }

        Ok(RoundBackfillPlan {
            round_id: round.round_id,
            round_name: round.round_name.clone(),
            points_awarded: share.points_awarded,
            minimum_participant_score: share.minimum_participant_score,
            participant_count: share.participant_count,
        })
    }
}

fn round_error(round: &RoundRef, detail: &str) -> String {
    format!("round {} ({}): {}", round.round_id, round.round_name, detail)
}
