//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `seasons.rs` - Competition and season operations
//! - `points.rs` - Point ledger and winner record operations
//! - `rounds.rs` - Round, fixture and bet operations

mod points;
mod rounds;
mod seasons;

use crate::domain::{FixtureId, RoundId, UserId};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// A registered user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub created_at: i64,
}

/// Minimal reference to a scored round, as returned by eligibility queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRef {
    pub round_id: RoundId,
    pub round_name: String,
}

/// One bet row to be written by a backfill batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserBet {
    pub user_id: UserId,
    pub fixture_id: FixtureId,
    pub points_awarded: i64,
    pub submitted_at: i64,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // User operations
    // =========================================================================

    /// Insert a user, returning the assigned id.
    ///
    /// # Errors
    /// Returns an error if the insert fails (including a duplicate username).
    pub async fn insert_user(&self, username: &str) -> Result<UserId, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, created_at)
            VALUES (?, ?)
            "#,
        )
        .bind(username)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(UserId::new(result.last_insert_rowid()))
    }

    /// Look up a user by id. Returns None when the user does not exist.
    pub async fn find_user(&self, user_id: UserId) -> Result<Option<UserRow>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, username, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| UserRow {
            id: UserId::new(r.get("id")),
            username: r.get("username"),
            created_at: r.get("created_at"),
        }))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Repository;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    pub(crate) async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }
}
