//! Append-only usage history, written once per observed quota figure and
//! never updated or deleted in place — it exists for the usage dashboard
//! and for offline analysis, not for the balancer's own decisions (those
//! read the latest figures off the `accounts` row instead).

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::UsageEntryWrite;

#[derive(Clone)]
pub struct UsageEntriesWriter {
    pool: SqlitePool,
}

impl UsageEntriesWriter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, entry: &UsageEntryWrite) -> Result<()> {
        sqlx::query(
            "INSERT INTO usage_entries (
                account_id, used_percent, input_tokens, output_tokens,
                window, reset_at, window_minutes,
                credits_has, credits_unlimited, credits_balance, recorded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.account_id)
        .bind(entry.used_percent)
        .bind(entry.input_tokens)
        .bind(entry.output_tokens)
        .bind(&entry.window)
        .bind(entry.reset_at)
        .bind(entry.window_minutes)
        .bind(entry.credits_has)
        .bind(entry.credits_unlimited)
        .bind(entry.credits_balance)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count_for_account(&self, account_id: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT count(*) FROM usage_entries WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
