//! Competition and season operations for the repository.

use crate::domain::{CompetitionContext, CompetitionId, CompetitionKind, SeasonId};
use sqlx::Row;

use super::Repository;

impl Repository {
    /// Insert a competition, returning the assigned id.
    pub async fn insert_competition(&self, name: &str) -> Result<CompetitionId, sqlx::Error> {
        let result = sqlx::query("INSERT INTO competitions (name) VALUES (?)")
            .bind(name)
            .execute(self.pool())
            .await?;

        Ok(CompetitionId::new(result.last_insert_rowid()))
    }

    /// Insert a season for a competition, returning the assigned id.
    ///
    /// `cup_active` records whether the last-round-special sub-competition
    /// runs alongside the league for this season.
    pub async fn insert_season(
        &self,
        competition_id: CompetitionId,
        cup_active: bool,
    ) -> Result<SeasonId, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO seasons (competition_id, completed_at, cup_active)
            VALUES (?, NULL, ?)
            "#,
        )
        .bind(competition_id.as_i64())
        .bind(cup_active as i64)
        .execute(self.pool())
        .await?;

        Ok(SeasonId::new(result.last_insert_rowid()))
    }

    /// Record a season as finished at the given timestamp.
    ///
    /// Returns false when the season does not exist.
    pub async fn mark_season_complete(
        &self,
        season_id: SeasonId,
        completed_at: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE seasons SET completed_at = ? WHERE id = ?")
            .bind(completed_at)
            .bind(season_id.as_i64())
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Seasons eligible for winner determination of the given kind:
    /// completed, and (for the cup) with the cup flag active. Ascending id
    /// for a reproducible sweep order.
    pub async fn list_eligible_seasons(
        &self,
        kind: CompetitionKind,
    ) -> Result<Vec<SeasonId>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id
            FROM seasons
            WHERE completed_at IS NOT NULL
              AND (? = 'league' OR cup_active = 1)
            ORDER BY id ASC
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|r| SeasonId::new(r.get("id")))
            .collect())
    }

    /// Resolve the competition context for an operation.
    ///
    /// With a season id: that season's context, if it exists. Without one:
    /// the current season, i.e. the most recent season not yet completed.
    /// None means there is nothing to operate on, which callers treat as an
    /// empty result rather than an error.
    pub async fn get_competition_context(
        &self,
        season_id: Option<SeasonId>,
    ) -> Result<Option<CompetitionContext>, sqlx::Error> {
        let row = match season_id {
            Some(id) => {
                sqlx::query(
                    r#"
                    SELECT s.id AS season_id, c.id AS competition_id, c.name AS competition_name
                    FROM seasons s
                    JOIN competitions c ON c.id = s.competition_id
                    WHERE s.id = ?
                    "#,
                )
                .bind(id.as_i64())
                .fetch_optional(self.pool())
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT s.id AS season_id, c.id AS competition_id, c.name AS competition_name
                    FROM seasons s
                    JOIN competitions c ON c.id = s.competition_id
                    WHERE s.completed_at IS NULL
                    ORDER BY s.id DESC
                    LIMIT 1
                    "#,
                )
                .fetch_optional(self.pool())
                .await?
            }
        };

        Ok(row.map(|r| CompetitionContext {
            competition_id: CompetitionId::new(r.get("competition_id")),
            season_id: SeasonId::new(r.get("season_id")),
            competition_name: r.get("competition_name"),
        }))
    }
}
