//! Round, fixture and bet operations for the repository.

use crate::domain::{CompetitionId, FixtureId, RoundId, RoundStatus, SeasonId, UserId};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

use super::{NewUserBet, Repository, RoundRef};

impl Repository {
    /// Insert a betting round in the `open` state, returning its id.
    pub async fn insert_round(
        &self,
        season_id: SeasonId,
        name: &str,
    ) -> Result<RoundId, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO betting_rounds (season_id, name, status)
            VALUES (?, ?, 'open')
            "#,
        )
        .bind(season_id.as_i64())
        .bind(name)
        .execute(self.pool())
        .await?;

        Ok(RoundId::new(result.last_insert_rowid()))
    }

    /// Advance a round's status, refusing to move the lifecycle backwards.
    ///
    /// Returns true when the round was updated; false when the round does
    /// not exist or the transition would not move forward.
    pub async fn advance_round_status(
        &self,
        round_id: RoundId,
        next: RoundStatus,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query("SELECT status FROM betting_rounds WHERE id = ?")
            .bind(round_id.as_i64())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Ok(false);
        };

        let status_str: String = row.get("status");
        let current = RoundStatus::from_str(&status_str).unwrap_or_else(|_| {
            warn!(round_id = %round_id, status = %status_str, "unknown round status in store, treating as open");
            RoundStatus::Open
        });

        if !current.can_advance_to(next) {
            warn!(round_id = %round_id, current = %current, requested = %next, "refusing backwards round transition");
            return Ok(false);
        }

        sqlx::query("UPDATE betting_rounds SET status = ? WHERE id = ?")
            .bind(next.as_str())
            .bind(round_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Insert a fixture into a round, returning its id.
    pub async fn insert_fixture(&self, round_id: RoundId) -> Result<FixtureId, sqlx::Error> {
        let result = sqlx::query("INSERT INTO fixtures (round_id) VALUES (?)")
            .bind(round_id.as_i64())
            .execute(self.pool())
            .await?;

        Ok(FixtureId::new(result.last_insert_rowid()))
    }

    /// Fixture ids of a round, ascending.
    pub async fn list_round_fixtures(
        &self,
        round_id: RoundId,
    ) -> Result<Vec<FixtureId>, sqlx::Error> {
        let rows = sqlx::query("SELECT id FROM fixtures WHERE round_id = ? ORDER BY id ASC")
            .bind(round_id.as_i64())
            .fetch_all(self.pool())
            .await?;

        Ok(rows
            .iter()
            .map(|r| FixtureId::new(r.get("id")))
            .collect())
    }

    /// Scored rounds of a competition in which the user has no bet at all.
    ///
    /// Participation is binary per round: a single bet on any fixture of the
    /// round removes it from this list. Ascending round id.
    pub async fn list_scored_rounds_without_user_bet(
        &self,
        user_id: UserId,
        competition_id: CompetitionId,
    ) -> Result<Vec<RoundRef>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT r.id AS round_id, r.name AS round_name
            FROM betting_rounds r
            JOIN seasons s ON s.id = r.season_id
            WHERE s.competition_id = ?
              AND r.status = 'scored'
              AND NOT EXISTS (
                  SELECT 1
                  FROM user_bets b
                  JOIN fixtures f ON f.id = b.fixture_id
                  WHERE f.round_id = r.id AND b.user_id = ?
              )
            ORDER BY r.id ASC
            "#,
        )
        .bind(competition_id.as_i64())
        .bind(user_id.as_i64())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|r| RoundRef {
                round_id: RoundId::new(r.get("round_id")),
                round_name: r.get("round_name"),
            })
            .collect())
    }

    /// Per-participant awarded-point totals for a round.
    ///
    /// One value per user with at least one bet on the round's fixtures.
    pub async fn list_existing_participant_totals(
        &self,
        round_id: RoundId,
    ) -> Result<Vec<i64>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT SUM(b.points_awarded) AS total
            FROM user_bets b
            JOIN fixtures f ON f.id = b.fixture_id
            WHERE f.round_id = ?
            GROUP BY b.user_id
            ORDER BY b.user_id ASC
            "#,
        )
        .bind(round_id.as_i64())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(|r| r.get("total")).collect())
    }

    /// Insert a single bet idempotently (the normal submission path).
    ///
    /// Returns true when a row was written, false when the (user, fixture)
    /// bet already existed.
    pub async fn insert_user_bet(
        &self,
        user_id: UserId,
        fixture_id: FixtureId,
        points_awarded: i64,
        submitted_at: i64,
    ) -> Result<bool, sqlx::Error> {
        let now = chrono::Utc::now().timestamp_millis();
        let result = sqlx::query(
            r#"
            INSERT INTO user_bets (user_id, fixture_id, points_awarded, submitted_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, fixture_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_i64())
        .bind(fixture_id.as_i64())
        .bind(points_awarded)
        .bind(submitted_at)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a batch of bets in a single transaction.
    ///
    /// Used by the backfill writer, so conflicts are NOT swallowed: a
    /// (user, fixture) collision means the user bet while the backfill ran,
    /// and the whole round's batch must roll back. Returns the row count.
    pub async fn insert_user_bets(&self, bets: &[NewUserBet]) -> Result<usize, sqlx::Error> {
        if bets.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool().begin().await?;

        for bet in bets {
            sqlx::query(
                r#"
                INSERT INTO user_bets (user_id, fixture_id, points_awarded, submitted_at, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(bet.user_id.as_i64())
            .bind(bet.fixture_id.as_i64())
            .bind(bet.points_awarded)
            .bind(bet.submitted_at)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(bets.len())
    }

    /// Total bets a user has placed anywhere in a competition.
    pub async fn count_user_bets_in_competition(
        &self,
        user_id: UserId,
        competition_id: CompetitionId,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS bet_count
            FROM user_bets b
            JOIN fixtures f ON f.id = b.fixture_id
            JOIN betting_rounds r ON r.id = f.round_id
            JOIN seasons s ON s.id = r.season_id
            WHERE s.competition_id = ? AND b.user_id = ?
            "#,
        )
        .bind(competition_id.as_i64())
        .bind(user_id.as_i64())
        .fetch_one(self.pool())
        .await?;

        Ok(row.get("bet_count"))
    }
}
