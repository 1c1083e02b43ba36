//! The persisted IP allowlist backing the API firewall.
//!
//! `ip_address` is always stored in its canonical `std::net::IpAddr`
//! display form, so a lookup by the same canonical string is enough —
//! the repository does no parsing or normalization itself, that's the
//! firewall crate's job.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::models::AllowlistEntry;

#[derive(Clone)]
pub struct AllowlistRepository {
    pool: SqlitePool,
}

impl AllowlistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_entries(&self) -> Result<Vec<AllowlistEntry>> {
        let rows: Vec<(String, chrono::NaiveDateTime)> =
            sqlx::query_as("SELECT ip_address, created_at FROM api_firewall_allowlist ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(ip_address, created_at)| AllowlistEntry { ip_address, created_at })
            .collect())
    }

    pub async fn list_ip_addresses(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT ip_address FROM api_firewall_allowlist")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(ip,)| ip).collect())
    }

    pub async fn exists(&self, ip_address: &str) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM api_firewall_allowlist WHERE ip_address = ?")
                .bind(ip_address)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    pub async fn add(&self, ip_address: &str) -> Result<()> {
        if self.exists(ip_address).await? {
            return Err(Error::Conflict(ip_address.to_string()));
        }
        sqlx::query("INSERT INTO api_firewall_allowlist (ip_address, created_at) VALUES (?, ?)")
            .bind(ip_address)
            .bind(Utc::now().naive_utc())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, ip_address: &str) -> Result<()> {
        let affected = sqlx::query("DELETE FROM api_firewall_allowlist WHERE ip_address = ?")
            .bind(ip_address)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(Error::NotFound(ip_address.to_string()));
        }
        Ok(())
    }
}
