use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::DbError;
use crate::models::SessionRow;

fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the session row if it does not exist yet; bump
    /// `updated_at` otherwise.
    pub async fn upsert(&self, session_id: &str, user_id: &str) -> Result<(), DbError> {
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, session_id: &str) -> Result<Option<SessionRow>, DbError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, current_query, log, created_at, updated_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn update_current_query(
        &self,
        session_id: &str,
        query: &str,
    ) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE sessions SET current_query = ?, updated_at = ? WHERE id = ?")
            .bind(query)
            .bind(now_timestamp())
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the session's stored event log with the given sequence.
    pub async fn update_log(&self, session_id: &str, events: &[String]) -> Result<bool, DbError> {
        let log = serde_json::to_string(events)?;

        let result = sqlx::query("UPDATE sessions SET log = ?, updated_at = ? WHERE id = ?")
            .bind(log)
            .bind(now_timestamp())
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
