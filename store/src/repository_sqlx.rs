use anyhow::Context;
use async_trait::async_trait;
use sqlx::{AnyPool, Row};

use crate::repository::KeyValueRepository;

/// SQLx-backed implementation of KeyValueRepository.
/// Responsible only for persistence; the schema lives in [`crate::db`].
pub struct SqlxRepository {
    pool: AnyPool,
}

impl SqlxRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueRepository for SqlxRepository {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query(r#"SELECT value FROM kv_state WHERE key = ?;"#)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read key {key}"))?;

        match row {
            Some(r) => Ok(Some(r.try_get::<String, _>("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO kv_state (key, value, updated_ms)
VALUES (?, ?, ?)
ON CONFLICT(key) DO UPDATE SET
  value = excluded.value,
  updated_ms = excluded.updated_ms;
"#,
        )
        .bind(key)
        .bind(value)
        .bind(common::time::now_ms() as i64)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write key {key}"))?;

        Ok(())
    }
}
