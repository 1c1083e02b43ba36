//! A narrow, read-only port onto `dashboard_settings`.
//!
//! The row is written by the dashboard's settings CRUD handlers, which
//! are out of scope for this workspace — the core only ever reads it, to
//! learn `sticky_threads_enabled` and `prefer_earlier_reset_accounts` at
//! startup and `totp_required_on_login` for the (also out-of-scope)
//! dashboard auth gate. A missing row (a fresh database with no
//! dashboard write yet) resolves to every field's documented default.

use sqlx::{Row, SqlitePool};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardSettings {
    pub sticky_threads_enabled: bool,
    pub prefer_earlier_reset_accounts: bool,
    pub totp_required_on_login: bool,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            sticky_threads_enabled: false,
            prefer_earlier_reset_accounts: false,
            totp_required_on_login: false,
        }
    }
}

#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_or_default(&self) -> Result<DashboardSettings> {
        let row = sqlx::query(
            "SELECT sticky_threads_enabled, prefer_earlier_reset_accounts, totp_required_on_login
             FROM dashboard_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => DashboardSettings {
                sticky_threads_enabled: row.try_get::<i64, _>("sticky_threads_enabled")? != 0,
                prefer_earlier_reset_accounts: row.try_get::<i64, _>("prefer_earlier_reset_accounts")? != 0,
                totp_required_on_login: row.try_get::<i64, _>("totp_required_on_login")? != 0,
            },
            None => DashboardSettings::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;

    async fn repo() -> SettingsRepository {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        migrate::run(&pool).await.unwrap();
        SettingsRepository::new(pool)
    }

    #[tokio::test]
    async fn missing_row_yields_defaults() {
        let repo = repo().await;
        assert_eq!(repo.get_or_default().await.unwrap(), DashboardSettings::default());
    }

    #[tokio::test]
    async fn existing_row_is_read() {
        let repo = repo().await;
        sqlx::query(
            "INSERT INTO dashboard_settings (id, sticky_threads_enabled, prefer_earlier_reset_accounts, totp_required_on_login)
             VALUES (1, 1, 1, 0)",
        )
        .execute(&repo.pool)
        .await
        .unwrap();

        let settings = repo.get_or_default().await.unwrap();
        assert!(settings.sticky_threads_enabled);
        assert!(settings.prefer_earlier_reset_accounts);
        assert!(!settings.totp_required_on_login);
    }
}
