use sqlx::SqlitePool;

use crate::error::DbError;
use crate::models::{CapabilityRecord, CapabilityRow};

#[derive(Clone)]
pub struct CapabilityRepository {
    pool: SqlitePool,
}

impl CapabilityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a batch of synthesized capabilities atomically.
    pub async fn insert_batch(&self, records: &[CapabilityRecord]) -> Result<usize, DbError> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO capabilities
                    (id, session_id, name, description, source, schema, created_by, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.id.to_string())
            .bind(&record.session_id)
            .bind(&record.name)
            .bind(&record.description)
            .bind(&record.source)
            .bind(&record.schema)
            .bind(&record.created_by)
            .bind(record.created_at.timestamp())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(records.len())
    }

    pub async fn find_by_session(&self, session_id: &str) -> Result<Vec<CapabilityRow>, DbError> {
        let rows: Vec<CapabilityRow> = sqlx::query_as(
            r#"
            SELECT id, session_id, name, description, source, schema, created_by, created_at
            FROM capabilities
            WHERE session_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations, SessionRepository};
    use serde_json::json;
    use toolbelt_core::CapabilitySpec;

    async fn setup_test_db() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn sample_record(session_id: &str, name: &str) -> CapabilityRecord {
        let spec = CapabilitySpec::new(
            name,
            "adds two numbers",
            json!({"type": "object", "properties": {"a": {"type": "number"}}}),
        );
        CapabilityRecord::from_spec(&spec, "def add_numbers(a, b):\n    return a + b\n", session_id, "user-1")
    }

    #[tokio::test]
    async fn test_insert_batch_and_find() {
        let pool = setup_test_db().await;
        SessionRepository::new(pool.clone())
            .upsert("sess-1", "user-1")
            .await
            .unwrap();

        let repo = CapabilityRepository::new(pool);
        let records = vec![
            sample_record("sess-1", "add_numbers"),
            sample_record("sess-1", "geocode_location"),
        ];

        let inserted = repo.insert_batch(&records).await.unwrap();
        assert_eq!(inserted, 2);

        let found = repo.find_by_session("sess-1").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|c| c.name == "add_numbers"));
    }

    #[tokio::test]
    async fn test_empty_batch_inserts_nothing() {
        let pool = setup_test_db().await;
        let repo = CapabilityRepository::new(pool);

        assert_eq!(repo.insert_batch(&[]).await.unwrap(), 0);
    }
}
