//! Account CRUD and status/usage updates.

use chrono::{NaiveDateTime, Utc};
use common::AccountStatus;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::error::{Error, Result};
use crate::models::{Account, PlanType, UsageSnapshot};

#[derive(Clone)]
pub struct AccountsRepository {
    pool: SqlitePool,
}

impl AccountsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_active(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            "SELECT * FROM accounts WHERE status != ? ORDER BY created_at ASC",
        )
        .bind(AccountStatus::Deactivated.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_account).collect()
    }

    pub async fn list_all(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query("SELECT * FROM accounts ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_account).collect()
    }

    pub async fn get(&self, id: &str) -> Result<Account> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        row_to_account(&row)
    }

    /// Insert a brand-new account, or overwrite an existing one's
    /// identity/credential fields. Used on config reload, not on every
    /// refresh — see [`Self::update_tokens`] for the refresh-path write.
    pub async fn upsert(&self, account: &Account) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts (
                id, chatgpt_account_id, email, plan_type,
                access_token_encrypted, refresh_token_encrypted, id_token_encrypted,
                last_refresh, status, deactivation_reason,
                primary_used_percent, primary_reset_at, primary_window_minutes,
                secondary_used_percent, secondary_reset_at,
                credits_has, credits_unlimited, credits_balance, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                chatgpt_account_id = excluded.chatgpt_account_id,
                email = excluded.email,
                plan_type = excluded.plan_type,
                access_token_encrypted = excluded.access_token_encrypted,
                refresh_token_encrypted = excluded.refresh_token_encrypted,
                id_token_encrypted = excluded.id_token_encrypted,
                last_refresh = excluded.last_refresh",
        )
        .bind(&account.id)
        .bind(&account.chatgpt_account_id)
        .bind(&account.email)
        .bind(account.plan_type.as_str())
        .bind(&account.access_token_encrypted)
        .bind(&account.refresh_token_encrypted)
        .bind(&account.id_token_encrypted)
        .bind(account.last_refresh)
        .bind(account.status.as_str())
        .bind(&account.deactivation_reason)
        .bind(account.usage.primary_used_percent)
        .bind(account.usage.primary_reset_at)
        .bind(account.usage.primary_window_minutes)
        .bind(account.usage.secondary_used_percent)
        .bind(account.usage.secondary_reset_at)
        .bind(account.usage.credits_has)
        .bind(account.usage.credits_unlimited)
        .bind(account.usage.credits_balance)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist a freshly refreshed token triple, recording `last_refresh`
    /// as the current time.
    pub async fn update_tokens(
        &self,
        id: &str,
        access_token_encrypted: &str,
        refresh_token_encrypted: &str,
        id_token_encrypted: Option<&str>,
    ) -> Result<()> {
        let now: NaiveDateTime = Utc::now().naive_utc();
        let affected = sqlx::query(
            "UPDATE accounts SET
                access_token_encrypted = ?,
                refresh_token_encrypted = ?,
                id_token_encrypted = ?,
                last_refresh = ?
             WHERE id = ?",
        )
        .bind(access_token_encrypted)
        .bind(refresh_token_encrypted)
        .bind(id_token_encrypted)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: AccountStatus,
        deactivation_reason: Option<&str>,
    ) -> Result<()> {
        let affected = sqlx::query(
            "UPDATE accounts SET status = ?, deactivation_reason = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(deactivation_reason)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn update_usage(&self, id: &str, usage: &UsageSnapshot) -> Result<()> {
        let affected = sqlx::query(
            "UPDATE accounts SET
                primary_used_percent = ?, primary_reset_at = ?, primary_window_minutes = ?,
                secondary_used_percent = ?, secondary_reset_at = ?,
                credits_has = ?, credits_unlimited = ?, credits_balance = ?
             WHERE id = ?",
        )
        .bind(usage.primary_used_percent)
        .bind(usage.primary_reset_at)
        .bind(usage.primary_window_minutes)
        .bind(usage.secondary_used_percent)
        .bind(usage.secondary_reset_at)
        .bind(usage.credits_has)
        .bind(usage.credits_unlimited)
        .bind(usage.credits_balance)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if affected == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let affected = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let status_raw: String = row.try_get("status")?;
    let status = AccountStatus::from_str_opt(&status_raw).unwrap_or(AccountStatus::Active);
    let plan_raw: String = row.try_get("plan_type")?;

    Ok(Account {
        id: row.try_get("id")?,
        chatgpt_account_id: row.try_get("chatgpt_account_id")?,
        email: row.try_get("email")?,
        plan_type: PlanType::coerce(Some(plan_raw.as_str())),
        access_token_encrypted: row.try_get("access_token_encrypted")?,
        refresh_token_encrypted: row.try_get("refresh_token_encrypted")?,
        id_token_encrypted: row.try_get("id_token_encrypted")?,
        last_refresh: row.try_get("last_refresh")?,
        status,
        deactivation_reason: row.try_get("deactivation_reason")?,
        usage: UsageSnapshot {
            primary_used_percent: row.try_get("primary_used_percent")?,
            primary_reset_at: row.try_get("primary_reset_at")?,
            primary_window_minutes: row.try_get("primary_window_minutes")?,
            secondary_used_percent: row.try_get("secondary_used_percent")?,
            secondary_reset_at: row.try_get("secondary_reset_at")?,
            credits_has: row.try_get("credits_has")?,
            credits_unlimited: row.try_get("credits_unlimited")?,
            credits_balance: row.try_get("credits_balance")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;

    async fn repo() -> AccountsRepository {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        migrate::run(&pool).await.unwrap();
        AccountsRepository::new(pool)
    }

    fn sample(id: &str) -> Account {
        Account {
            id: id.to_string(),
            chatgpt_account_id: Some("chatgpt-1".to_string()),
            email: Some("user@example.com".to_string()),
            plan_type: PlanType::Pro,
            access_token_encrypted: "enc-access".to_string(),
            refresh_token_encrypted: "enc-refresh".to_string(),
            id_token_encrypted: Some("enc-id".to_string()),
            last_refresh: Utc::now().naive_utc(),
            status: AccountStatus::Active,
            deactivation_reason: None,
            usage: UsageSnapshot::default(),
            created_at: Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let repo = repo().await;
        repo.upsert(&sample("acc-1")).await.unwrap();
        let fetched = repo.get("acc-1").await.unwrap();
        assert_eq!(fetched.email.as_deref(), Some("user@example.com"));
        assert_eq!(fetched.plan_type, PlanType::Pro);
        assert_eq!(fetched.status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn get_missing_account_is_not_found() {
        let repo = repo().await;
        let err = repo.get("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn list_active_excludes_deactivated() {
        let repo = repo().await;
        repo.upsert(&sample("acc-1")).await.unwrap();
        repo.upsert(&sample("acc-2")).await.unwrap();
        repo.update_status("acc-2", AccountStatus::Deactivated, Some("bad grant"))
            .await
            .unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "acc-1");
    }

    #[tokio::test]
    async fn update_tokens_bumps_last_refresh() {
        let repo = repo().await;
        let mut account = sample("acc-1");
        account.last_refresh = NaiveDateTime::UNIX_EPOCH;
        repo.upsert(&account).await.unwrap();

        repo.update_tokens("acc-1", "new-access", "new-refresh", None)
            .await
            .unwrap();

        let fetched = repo.get("acc-1").await.unwrap();
        assert_eq!(fetched.access_token_encrypted, "new-access");
        assert!(fetched.last_refresh > NaiveDateTime::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn update_usage_persists_quota_figures() {
        let repo = repo().await;
        repo.upsert(&sample("acc-1")).await.unwrap();
        let usage = UsageSnapshot {
            primary_used_percent: Some(42.0),
            primary_reset_at: Some(1_700_000_000),
            ..UsageSnapshot::default()
        };
        repo.update_usage("acc-1", &usage).await.unwrap();

        let fetched = repo.get("acc-1").await.unwrap();
        assert_eq!(fetched.usage.primary_used_percent, Some(42.0));
        assert_eq!(fetched.usage.primary_reset_at, Some(1_700_000_000));
    }

    #[tokio::test]
    async fn delete_removes_account() {
        let repo = repo().await;
        repo.upsert(&sample("acc-1")).await.unwrap();
        repo.delete("acc-1").await.unwrap();
        assert!(matches!(repo.get("acc-1").await.unwrap_err(), Error::NotFound(_)));
    }
}
