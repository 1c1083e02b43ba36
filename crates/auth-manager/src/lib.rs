//! Keeps an account's OAuth tokens fresh, deactivating it in the store
//! when the identity provider rejects a refresh with a permanent code.

mod error;

pub use error::{Error, Result};

use std::time::Duration;

use common::AccountStatus;
use oauth_client::DEFAULT_REFRESH_INTERVAL_DAYS;
use store::{Account, Store};

pub struct AuthManagerConfig {
    pub auth_base_url: String,
    pub client_id: String,
    pub scope: String,
    pub refresh_interval_days: i64,
    pub request_timeout: Duration,
}

impl Default for AuthManagerConfig {
    fn default() -> Self {
        Self {
            auth_base_url: String::new(),
            client_id: String::new(),
            scope: "openid profile email".to_string(),
            refresh_interval_days: DEFAULT_REFRESH_INTERVAL_DAYS,
            request_timeout: Duration::from_secs(10),
        }
    }
}

pub struct AuthManager {
    store: Store,
    encryptor: crypto::TokenEncryptor,
    http: reqwest::Client,
    config: AuthManagerConfig,
}

impl AuthManager {
    pub fn new(store: Store, encryptor: crypto::TokenEncryptor, http: reqwest::Client, config: AuthManagerConfig) -> Self {
        Self {
            store,
            encryptor,
            http,
            config,
        }
    }

    /// Refresh `account`'s tokens if `force` is set or its last refresh is
    /// older than the configured interval; otherwise return it unchanged.
    pub async fn ensure_fresh(&self, account: Account, force: bool, now_unix: i64) -> Result<Account> {
        let last_refresh_unix = account.last_refresh.and_utc().timestamp();
        if force || oauth_client::should_refresh(last_refresh_unix, now_unix, self.config.refresh_interval_days) {
            return self.refresh_account(account, None).await;
        }
        Ok(account)
    }

    /// Force a refresh regardless of staleness, e.g. after the upstream
    /// reports a 401 on an otherwise-fresh token.
    pub async fn refresh_account(&self, account: Account, request_id: Option<&str>) -> Result<Account> {
        let refresh_token = self.encryptor.decrypt(&account.refresh_token_encrypted)?;

        let result = oauth_client::refresh_token(
            &self.http,
            &self.config.auth_base_url,
            &self.config.client_id,
            &refresh_token,
            &self.config.scope,
            self.config.request_timeout,
            request_id,
        )
        .await;

        let refreshed = match result {
            Ok(refreshed) => refreshed,
            Err(err @ oauth_client::Error::Rejected { is_permanent: true, .. }) => {
                let reason = match &err {
                    oauth_client::Error::Rejected { code, message, .. } => {
                        common::permanent_reason(code).unwrap_or(message.as_str()).to_string()
                    }
                    _ => unreachable!(),
                };
                self.store
                    .accounts
                    .update_status(&account.id, AccountStatus::Deactivated, Some(&reason))
                    .await?;
                return Err(Error::Deactivated { reason });
            }
            Err(err) => return Err(Error::RefreshFailed(err)),
        };

        let access_token_encrypted = self.encryptor.encrypt(&refreshed.access_token)?;
        let refresh_token_encrypted = self.encryptor.encrypt(&refreshed.refresh_token)?;
        let id_token_encrypted = refreshed
            .id_token
            .as_deref()
            .map(|token| self.encryptor.encrypt(token))
            .transpose()?;

        self.store
            .accounts
            .update_tokens(
                &account.id,
                &access_token_encrypted,
                &refresh_token_encrypted,
                id_token_encrypted.as_deref(),
            )
            .await?;

        let mut updated = self.store.accounts.get(&account.id).await?;
        if let Some(plan_type) = refreshed.plan_type.as_deref() {
            updated.plan_type = store::PlanType::coerce(Some(plan_type));
        }
        if let Some(email) = refreshed.email {
            updated.email = Some(email);
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AccountStatus;
    use store::{PlanType, UsageSnapshot};

    fn encryptor() -> crypto::TokenEncryptor {
        crypto::TokenEncryptor::from_key_bytes([9u8; 32])
    }

    async fn seeded_store(enc: &crypto::TokenEncryptor, last_refresh_unix: i64) -> Store {
        let store = Store::in_memory().await.unwrap();
        let account = Account {
            id: "acc-1".to_string(),
            chatgpt_account_id: None,
            email: None,
            plan_type: PlanType::default(),
            access_token_encrypted: enc.encrypt("old-access").unwrap(),
            refresh_token_encrypted: enc.encrypt("old-refresh").unwrap(),
            id_token_encrypted: None,
            last_refresh: chrono::DateTime::from_timestamp(last_refresh_unix, 0).unwrap().naive_utc(),
            status: AccountStatus::Active,
            deactivation_reason: None,
            usage: UsageSnapshot::default(),
            created_at: chrono::Utc::now().naive_utc(),
        };
        store.accounts.upsert(&account).await.unwrap();
        store
    }

    #[tokio::test]
    async fn fresh_account_is_returned_unchanged_without_force() {
        let enc = encryptor();
        let now = 1_700_000_000;
        let store = seeded_store(&enc, now - 3600).await;
        let manager = AuthManager::new(store.clone(), encryptor(), reqwest::Client::new(), AuthManagerConfig::default());

        let account = store.accounts.get("acc-1").await.unwrap();
        let result = manager.ensure_fresh(account, false, now).await.unwrap();

        assert_eq!(enc.decrypt(&result.access_token_encrypted).unwrap(), "old-access");
    }

    #[tokio::test]
    async fn stale_account_without_force_still_triggers_refresh_attempt() {
        let enc = encryptor();
        let now = 1_700_000_000;
        let nine_days_ago = now - 9 * 86_400;
        let store = seeded_store(&enc, nine_days_ago).await;
        let manager = AuthManager::new(
            store.clone(),
            encryptor(),
            reqwest::Client::new(),
            AuthManagerConfig {
                auth_base_url: "http://127.0.0.1:1".to_string(),
                ..AuthManagerConfig::default()
            },
        );

        let account = store.accounts.get("acc-1").await.unwrap();
        let result = manager.ensure_fresh(account, false, now).await;
        assert!(matches!(result, Err(Error::RefreshFailed(_))));
    }
}
