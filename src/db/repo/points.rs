//! Point ledger and winner record operations for the repository.

use crate::domain::{
    CompetitionKind, RoundId, SeasonId, StandingsEntry, UserId, UserPointTotal, WinnerRecord,
};
use sqlx::Row;

use super::Repository;

impl Repository {
    /// Record points a user earned in a round for one competition kind.
    ///
    /// Written by the match scorer; the reconciliation core only reads these.
    pub async fn insert_point_record(
        &self,
        user_id: UserId,
        round_id: RoundId,
        kind: CompetitionKind,
        points: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_point_records (user_id, round_id, competition_kind, points)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id.as_i64())
        .bind(round_id.as_i64())
        .bind(kind.as_str())
        .bind(points)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Aggregate per-user point totals for a season and competition kind.
    ///
    /// One row per user who has at least one point record in the scope;
    /// zero-point records still count as participation.
    pub async fn list_user_point_totals(
        &self,
        season_id: SeasonId,
        kind: CompetitionKind,
    ) -> Result<Vec<UserPointTotal>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT u.id AS user_id, u.username AS username, SUM(p.points) AS points
            FROM user_point_records p
            JOIN betting_rounds r ON r.id = p.round_id
            JOIN users u ON u.id = p.user_id
            WHERE r.season_id = ? AND p.competition_kind = ?
            GROUP BY u.id, u.username
            ORDER BY u.id ASC
            "#,
        )
        .bind(season_id.as_i64())
        .bind(kind.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|r| UserPointTotal {
                user_id: UserId::new(r.get("user_id")),
                username: r.get("username"),
                points: r.get("points"),
            })
            .collect())
    }

    /// The committed winner set for a (season, kind) key, ordered by user id.
    ///
    /// Empty means the key is still undetermined.
    pub async fn list_existing_winners(
        &self,
        season_id: SeasonId,
        kind: CompetitionKind,
    ) -> Result<Vec<WinnerRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT season_id, competition_kind, user_id, total_points, final_rank, determined_at
            FROM season_winners
            WHERE season_id = ? AND competition_kind = ?
            ORDER BY user_id ASC
            "#,
        )
        .bind(season_id.as_i64())
        .bind(kind.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|r| WinnerRecord {
                season_id: SeasonId::new(r.get("season_id")),
                kind,
                user_id: UserId::new(r.get("user_id")),
                total_points: r.get("total_points"),
                rank: r.get("final_rank"),
                determined_at: r.get("determined_at"),
            })
            .collect())
    }

    /// Persist a winner set in a single transaction.
    ///
    /// No conflict clause on purpose: the UNIQUE(season, kind, user) key is
    /// the serialization point for concurrent determinations, and the loser
    /// of a race must see the constraint error to fall back to the committed
    /// set. If any row fails, none are committed.
    pub async fn insert_winners(
        &self,
        season_id: SeasonId,
        kind: CompetitionKind,
        winners: &[StandingsEntry],
        determined_at: i64,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        for winner in winners {
            sqlx::query(
                r#"
                INSERT INTO season_winners
                (season_id, competition_kind, user_id, total_points, final_rank, determined_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(season_id.as_i64())
            .bind(kind.as_str())
            .bind(winner.user_id.as_i64())
            .bind(winner.points)
            .bind(winner.rank)
            .bind(determined_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::setup_test_db;
    use super::*;
    use crate::domain::RoundStatus;

    async fn seed_season(repo: &Repository) -> (SeasonId, RoundId) {
        let comp = repo.insert_competition("Premier Tips").await.unwrap();
        let season = repo.insert_season(comp, true).await.unwrap();
        let round = repo.insert_round(season, "Round 1").await.unwrap();
        repo.advance_round_status(round, RoundStatus::Scored)
            .await
            .unwrap();
        (season, round)
    }

    fn entry(user_id: UserId, username: &str, points: i64, rank: i64) -> StandingsEntry {
        StandingsEntry {
            user_id,
            username: username.to_string(),
            points,
            rank,
            is_tied: false,
        }
    }

    #[tokio::test]
    async fn totals_sum_across_rounds_per_kind() {
        let (repo, _temp) = setup_test_db().await;
        let (season, round1) = seed_season(&repo).await;
        let round2 = repo.insert_round(season, "Round 2").await.unwrap();

        let alice = repo.insert_user("alice").await.unwrap();
        let bob = repo.insert_user("bob").await.unwrap();

        repo.insert_point_record(alice, round1, CompetitionKind::League, 7)
            .await
            .unwrap();
        repo.insert_point_record(alice, round2, CompetitionKind::League, 5)
            .await
            .unwrap();
        repo.insert_point_record(bob, round1, CompetitionKind::League, 4)
            .await
            .unwrap();
        // Cup points live in their own ledger and must not bleed in.
        repo.insert_point_record(alice, round1, CompetitionKind::Cup, 99)
            .await
            .unwrap();

        let totals = repo
            .list_user_point_totals(season, CompetitionKind::League)
            .await
            .unwrap();

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].username, "alice");
        assert_eq!(totals[0].points, 12);
        assert_eq!(totals[1].username, "bob");
        assert_eq!(totals[1].points, 4);

        let cup = repo
            .list_user_point_totals(season, CompetitionKind::Cup)
            .await
            .unwrap();
        assert_eq!(cup.len(), 1);
        assert_eq!(cup[0].points, 99);
    }

    #[tokio::test]
    async fn winners_round_trip() {
        let (repo, _temp) = setup_test_db().await;
        let (season, _round) = seed_season(&repo).await;
        let alice = repo.insert_user("alice").await.unwrap();

        assert!(repo
            .list_existing_winners(season, CompetitionKind::League)
            .await
            .unwrap()
            .is_empty());

        repo.insert_winners(
            season,
            CompetitionKind::League,
            &[entry(alice, "alice", 30, 1)],
            5_000,
        )
        .await
        .unwrap();

        let winners = repo
            .list_existing_winners(season, CompetitionKind::League)
            .await
            .unwrap();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].user_id, alice);
        assert_eq!(winners[0].total_points, 30);
        assert_eq!(winners[0].rank, 1);
        assert_eq!(winners[0].determined_at, 5_000);

        // The cup ledger for the same season stays untouched.
        assert!(repo
            .list_existing_winners(season, CompetitionKind::Cup)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn duplicate_winner_insert_hits_the_unique_key() {
        let (repo, _temp) = setup_test_db().await;
        let (season, _round) = seed_season(&repo).await;
        let alice = repo.insert_user("alice").await.unwrap();

        let set = [entry(alice, "alice", 30, 1)];
        repo.insert_winners(season, CompetitionKind::League, &set, 5_000)
            .await
            .unwrap();

        let err = repo
            .insert_winners(season, CompetitionKind::League, &set, 6_000)
            .await
            .expect_err("second insert must conflict");
        match err {
            sqlx::Error::Database(db) => {
                assert!(matches!(
                    db.kind(),
                    sqlx::error::ErrorKind::UniqueViolation
                ));
            }
            other => panic!("expected a database error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn failed_batch_commits_no_winner_rows() {
        let (repo, _temp) = setup_test_db().await;
        let (season, _round) = seed_season(&repo).await;
        let alice = repo.insert_user("alice").await.unwrap();
        let bob = repo.insert_user("bob").await.unwrap();

        // Second row repeats alice's user id, so the batch must fail whole.
        let bad_set = [
            entry(bob, "bob", 30, 1),
            entry(alice, "alice", 30, 1),
            entry(alice, "alice", 30, 1),
        ];
        assert!(repo
            .insert_winners(season, CompetitionKind::League, &bad_set, 5_000)
            .await
            .is_err());

        assert!(repo
            .list_existing_winners(season, CompetitionKind::League)
            .await
            .unwrap()
            .is_empty());
    }
}
