//! Shared application state, constructed once at startup and cloned
//! (cheaply — every field is an `Arc`-backed or internally-cloneable
//! handle) into every handler.

use std::sync::Arc;

use auth_manager::{AuthManager, AuthManagerConfig};
use balancer::Balancer;
use crypto::TokenEncryptor;
use firewall::{Firewall, FirewallConfig};
use store::Store;
use upstream_client::{SafeFetchConfig, UpstreamClient};

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub balancer: Arc<Balancer>,
    pub auth_manager: Arc<AuthManager>,
    pub upstream: Arc<UpstreamClient>,
    pub firewall: Arc<Firewall>,
    pub encryptor: Arc<TokenEncryptor>,
    pub safe_fetch: SafeFetchConfig,
    pub orchestrator_max_account_attempts: usize,
    pub sticky_threads_enabled: bool,
}

impl AppState {
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let store = Store::connect(&config.database_url).await?;
        let encryptor = TokenEncryptor::from_config_str(&config.token_encryption_key)
            .map_err(|e| anyhow::anyhow!("invalid TOKEN_ENCRYPTION_KEY: {e}"))?;
        let http = reqwest::Client::builder().build()?;

        let settings = store.settings.get_or_default().await?;

        let balancer = Balancer::new(store.clone(), settings.prefer_earlier_reset_accounts);

        let auth_manager = AuthManager::new(
            store.clone(),
            TokenEncryptor::from_config_str(&config.token_encryption_key)
                .map_err(|e| anyhow::anyhow!("invalid TOKEN_ENCRYPTION_KEY: {e}"))?,
            http.clone(),
            AuthManagerConfig {
                auth_base_url: config.auth_base_url.clone(),
                client_id: config.oauth_client_id.clone(),
                scope: config.oauth_scope.clone(),
                refresh_interval_days: config.token_refresh_interval_days,
                request_timeout: config.token_refresh_timeout(),
            },
        );

        let upstream = UpstreamClient::new(http.clone(), config.upstream_base_url.clone());

        let firewall = Firewall::new(
            store.allowlist.clone(),
            FirewallConfig {
                trust_proxy_headers: config.firewall_trust_proxy_headers,
                trusted_proxy_cidrs: config.firewall_trusted_proxy_cidrs.clone(),
            },
        );

        let safe_fetch = SafeFetchConfig {
            enabled: config.image_inline_fetch_enabled,
            max_bytes: config.image_inline_max_bytes,
            allowed_hosts: config.image_inline_allowed_hosts.clone(),
            ..SafeFetchConfig::default()
        };

        Ok(Self {
            store,
            balancer: Arc::new(balancer),
            auth_manager: Arc::new(auth_manager),
            upstream: Arc::new(upstream),
            firewall: Arc::new(firewall),
            encryptor: Arc::new(encryptor),
            safe_fetch,
            orchestrator_max_account_attempts: config.orchestrator_max_account_attempts,
            sticky_threads_enabled: settings.sticky_threads_enabled,
        })
    }
}
