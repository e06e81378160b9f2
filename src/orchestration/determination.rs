//! Season winner determination.

use crate::db::Repository;
use crate::domain::{CompetitionKind, SeasonId, WinnerRecord};
use crate::engine::{rank_standings, top_ranked};
use std::sync::Arc;
use thiserror::Error;

/// Determines and persists season winners, idempotently per
/// (season, competition kind) key.
#[derive(Clone)]
pub struct WinnerDetermination {
    repo: Arc<Repository>,
    winner_count: usize,
}

/// The result of one determination call.
#[derive(Debug, Clone)]
pub struct DeterminationOutcome {
    pub season_id: SeasonId,
    pub kind: CompetitionKind,
    pub winners: Vec<WinnerRecord>,
    /// True when a committed winner set already existed and was returned
    /// verbatim; nothing was recomputed or written.
    pub already_determined: bool,
}

/// The result of a sweep across all eligible seasons.
#[derive(Debug, Clone, Default)]
pub struct SeasonSweep {
    pub determined: Vec<DeterminationOutcome>,
    pub errors: Vec<SeasonSweepError>,
}

/// One failed season within a sweep.
#[derive(Debug, Clone)]
pub struct SeasonSweepError {
    pub season_id: SeasonId,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum DeterminationError {
    /// The committed winner rows for this key contradict each other.
    /// Retrying cannot fix this; the rows need manual repair. Kept apart
    /// from `Store` so operators can tell the two situations apart.
    #[error("winner set for season {season_id} ({kind}) is corrupt: {detail}")]
    CorruptWinnerSet {
        season_id: SeasonId,
        kind: CompetitionKind,
        detail: String,
    },
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl WinnerDetermination {
    pub fn new(repo: Arc<Repository>, winner_count: usize) -> Self {
        Self { repo, winner_count }
    }

    /// Determine winners for one (season, kind) key.
    ///
    /// An existing committed set short-circuits the call: it is validated
    /// and returned as-is with `already_determined = true`. Otherwise point
    /// totals are aggregated, ranked, and the leading group is persisted in
    /// one transaction. Losing an insert race against a concurrent call
    /// falls back to the winner set that call committed.
    pub async fn determine_winners(
        &self,
        season_id: SeasonId,
        kind: CompetitionKind,
    ) -> Result<DeterminationOutcome, DeterminationError> {
        let existing = self.repo.list_existing_winners(season_id, kind).await?;
        if !existing.is_empty() {
            verify_winner_set(season_id, kind, &existing)?;
            return Ok(DeterminationOutcome {
                season_id,
                kind,
                winners: existing,
                already_determined: true,
            });
        }

        let totals = self.repo.list_user_point_totals(season_id, kind).await?;
        let standings = rank_standings(totals);
        let winners = top_ranked(&standings, self.winner_count);

        if winners.is_empty() {
            tracing::info!(season_id = %season_id, kind = %kind, "no participants; season stays undetermined");
            return Ok(DeterminationOutcome {
                season_id,
                kind,
                winners: Vec::new(),
                already_determined: false,
            });
        }

        let determined_at = chrono::Utc::now().timestamp_millis();
        match self
            .repo
            .insert_winners(season_id, kind, &winners, determined_at)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    season_id = %season_id,
                    kind = %kind,
                    winners = winners.len(),
                    points = winners[0].points,
                    "season winners recorded"
                );
                let records = winners
                    .into_iter()
                    .map(|w| WinnerRecord {
                        season_id,
                        kind,
                        user_id: w.user_id,
                        total_points: w.points,
                        rank: w.rank,
                        determined_at,
                    })
                    .collect();
                Ok(DeterminationOutcome {
                    season_id,
                    kind,
                    winners: records,
                    already_determined: false,
                })
            }
            Err(err) if is_unique_violation(&err) => {
                // A concurrent determination committed first; its set wins.
                tracing::info!(season_id = %season_id, kind = %kind, "lost determination race, returning committed set");
                let committed = self.repo.list_existing_winners(season_id, kind).await?;
                verify_winner_set(season_id, kind, &committed)?;
                Ok(DeterminationOutcome {
                    season_id,
                    kind,
                    winners: committed,
                    already_determined: true,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Run determination across every eligible season of the given kind.
    ///
    /// Seasons are processed in ascending id order. One season's failure is
    /// collected and the sweep moves on; the outcome reports both sides.
    pub async fn determine_for_eligible_seasons(
        &self,
        kind: CompetitionKind,
    ) -> Result<SeasonSweep, DeterminationError> {
        let seasons = self.repo.list_eligible_seasons(kind).await?;

        let mut sweep = SeasonSweep::default();
        for season_id in seasons {
            match self.determine_winners(season_id, kind).await {
                Ok(outcome) => sweep.determined.push(outcome),
                Err(err) => {
                    tracing::warn!(season_id = %season_id, kind = %kind, error = %err, "season determination failed; sweep continues");
                    sweep.errors.push(SeasonSweepError {
                        season_id,
                        message: err.to_string(),
                    });
                }
            }
        }

        Ok(sweep)
    }
}

/// A committed set is consistent iff every row is rank 1 and all rows carry
/// one and the same total.
fn verify_winner_set(
    season_id: SeasonId,
    kind: CompetitionKind,
    records: &[WinnerRecord],
) -> Result<(), DeterminationError> {
    let Some(first) = records.first() else {
        return Ok(());
    };

    for record in records {
        if record.rank != 1 {
            return Err(DeterminationError::CorruptWinnerSet {
                season_id,
                kind,
                detail: format!("user {} holds rank {}", record.user_id, record.rank),
            });
        }
        if record.total_points != first.total_points {
            return Err(DeterminationError::CorruptWinnerSet {
                season_id,
                kind,
                detail: format!(
                    "user {} has {} points, user {} has {}",
                    first.user_id, first.total_points, record.user_id, record.total_points
                ),
            });
        }
    }

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{RoundId, RoundStatus, StandingsEntry, UserId};
    use tempfile::TempDir;

    async fn setup_repo() -> (Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Arc::new(Repository::new(pool)), temp_dir)
    }

    async fn seed_completed_season(repo: &Repository) -> (SeasonId, RoundId) {
        let comp = repo.insert_competition("Premier Tips").await.unwrap();
        let season = repo.insert_season(comp, true).await.unwrap();
        repo.mark_season_complete(season, 10_000).await.unwrap();
        let round = repo.insert_round(season, "Round 1").await.unwrap();
        repo.advance_round_status(round, RoundStatus::Scored)
            .await
            .unwrap();
        (season, round)
    }

    async fn seed_user_with_points(
        repo: &Repository,
        round: RoundId,
        username: &str,
        points: i64,
    ) -> UserId {
        let user = repo.insert_user(username).await.unwrap();
        repo.insert_point_record(user, round, CompetitionKind::League, points)
            .await
            .unwrap();
        user
    }

    #[tokio::test]
    async fn determines_single_winner() {
        let (repo, _temp) = setup_repo().await;
        let (season, round) = seed_completed_season(&repo).await;

        let alice = seed_user_with_points(&repo, round, "Alice", 30).await;
        seed_user_with_points(&repo, round, "Bob", 25).await;
        seed_user_with_points(&repo, round, "Charlie", 25).await;
        seed_user_with_points(&repo, round, "Diana", 10).await;

        let service = WinnerDetermination::new(repo.clone(), 1);
        let outcome = service
            .determine_winners(season, CompetitionKind::League)
            .await
            .unwrap();

        assert!(!outcome.already_determined);
        assert_eq!(outcome.winners.len(), 1);
        assert_eq!(outcome.winners[0].user_id, alice);
        assert_eq!(outcome.winners[0].total_points, 30);
        assert_eq!(outcome.winners[0].rank, 1);
    }

    #[tokio::test]
    async fn second_call_is_idempotent() {
        let (repo, _temp) = setup_repo().await;
        let (season, round) = seed_completed_season(&repo).await;
        seed_user_with_points(&repo, round, "Alice", 30).await;
        seed_user_with_points(&repo, round, "Bob", 10).await;

        let service = WinnerDetermination::new(repo.clone(), 1);
        let first = service
            .determine_winners(season, CompetitionKind::League)
            .await
            .unwrap();
        let second = service
            .determine_winners(season, CompetitionKind::League)
            .await
            .unwrap();

        assert!(!first.already_determined);
        assert!(second.already_determined);
        assert_eq!(
            first.winners.iter().map(|w| w.user_id).collect::<Vec<_>>(),
            second.winners.iter().map(|w| w.user_id).collect::<Vec<_>>()
        );
        assert_eq!(first.winners[0].total_points, second.winners[0].total_points);

        // No duplicate rows behind the scenes.
        let stored = repo
            .list_existing_winners(season, CompetitionKind::League)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn tied_leaders_are_all_recorded() {
        let (repo, _temp) = setup_repo().await;
        let (season, round) = seed_completed_season(&repo).await;
        seed_user_with_points(&repo, round, "Alice", 100).await;
        seed_user_with_points(&repo, round, "Bob", 100).await;
        seed_user_with_points(&repo, round, "Charlie", 100).await;
        seed_user_with_points(&repo, round, "Diana", 80).await;

        let service = WinnerDetermination::new(repo, 1);
        let outcome = service
            .determine_winners(season, CompetitionKind::League)
            .await
            .unwrap();

        assert_eq!(outcome.winners.len(), 3);
        assert!(outcome
            .winners
            .iter()
            .all(|w| w.rank == 1 && w.total_points == 100));
    }

    #[tokio::test]
    async fn no_participants_leaves_season_undetermined() {
        let (repo, _temp) = setup_repo().await;
        let (season, round) = seed_completed_season(&repo).await;

        let service = WinnerDetermination::new(repo.clone(), 1);
        let outcome = service
            .determine_winners(season, CompetitionKind::League)
            .await
            .unwrap();

        assert!(outcome.winners.is_empty());
        assert!(!outcome.already_determined);

        // Data arriving later can still determine the season.
        seed_user_with_points(&repo, round, "Alice", 5).await;
        let retry = service
            .determine_winners(season, CompetitionKind::League)
            .await
            .unwrap();
        assert_eq!(retry.winners.len(), 1);
        assert!(!retry.already_determined);
    }

    #[tokio::test]
    async fn corrupt_winner_set_is_reported_distinctly() {
        let (repo, _temp) = setup_repo().await;
        let (season, round) = seed_completed_season(&repo).await;
        let alice = seed_user_with_points(&repo, round, "Alice", 30).await;

        // A rank-2 row alone can never be a complete set.
        let bad = StandingsEntry {
            user_id: alice,
            username: "Alice".to_string(),
            points: 30,
            rank: 2,
            is_tied: false,
        };
        repo.insert_winners(season, CompetitionKind::League, &[bad], 5_000)
            .await
            .unwrap();

        let service = WinnerDetermination::new(repo, 1);
        let err = service
            .determine_winners(season, CompetitionKind::League)
            .await
            .expect_err("corrupt set must fail");
        assert!(matches!(err, DeterminationError::CorruptWinnerSet { .. }));
    }

    #[tokio::test]
    async fn sweep_processes_all_seasons_and_collects_errors() {
        let (repo, _temp) = setup_repo().await;

        let comp = repo.insert_competition("Premier Tips").await.unwrap();

        let healthy = repo.insert_season(comp, false).await.unwrap();
        repo.mark_season_complete(healthy, 10_000).await.unwrap();
        let round1 = repo.insert_round(healthy, "Round 1").await.unwrap();
        repo.advance_round_status(round1, RoundStatus::Scored)
            .await
            .unwrap();
        let alice = repo.insert_user("Alice").await.unwrap();
        repo.insert_point_record(alice, round1, CompetitionKind::League, 12)
            .await
            .unwrap();

        let broken = repo.insert_season(comp, false).await.unwrap();
        repo.mark_season_complete(broken, 20_000).await.unwrap();
        let bad = StandingsEntry {
            user_id: alice,
            username: "Alice".to_string(),
            points: 9,
            rank: 3,
            is_tied: false,
        };
        repo.insert_winners(broken, CompetitionKind::League, &[bad], 5_000)
            .await
            .unwrap();

        let service = WinnerDetermination::new(repo, 1);
        let sweep = service
            .determine_for_eligible_seasons(CompetitionKind::League)
            .await
            .unwrap();

        assert_eq!(sweep.determined.len(), 1);
        assert_eq!(sweep.determined[0].season_id, healthy);
        assert_eq!(sweep.errors.len(), 1);
        assert_eq!(sweep.errors[0].season_id, broken);
        assert!(sweep.errors[0].message.contains("corrupt"));
    }

    #[tokio::test]
    async fn sweep_skips_incomplete_seasons() {
        let (repo, _temp) = setup_repo().await;

        let comp = repo.insert_competition("Premier Tips").await.unwrap();
        repo.insert_season(comp, false).await.unwrap();

        let service = WinnerDetermination::new(repo, 1);
        let sweep = service
            .determine_for_eligible_seasons(CompetitionKind::League)
            .await
            .unwrap();
        assert!(sweep.determined.is_empty());
        assert!(sweep.errors.is_empty());
    }
}
