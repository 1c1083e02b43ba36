//! Sticky-session lookups, keyed by a caller-supplied session key
//! (typically a conversation id).

use sqlx::SqlitePool;

use crate::error::Result;

#[derive(Clone)]
pub struct StickySessionsRepository {
    pool: SqlitePool,
}

impl StickySessionsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_account_id(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT account_id FROM sticky_sessions WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(account_id,)| account_id))
    }

    pub async fn upsert(&self, key: &str, account_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO sticky_sessions (key, account_id) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET account_id = excluded.account_id",
        )
        .bind(key)
        .bind(account_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM sticky_sessions WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
