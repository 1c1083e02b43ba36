//! IP allowlist enforcement with trusted-proxy header handling.
//!
//! An empty allowlist means "allow all" — the firewall only starts
//! rejecting once an operator has added at least one entry (via the
//! out-of-scope dashboard). This crate owns client-IP resolution and the
//! allow/deny decision; the allowlist rows themselves live in `store`.

mod error;
mod ip;
mod resolver;

pub use error::{Error, Result};
pub use ip::normalize_ip;
pub use resolver::ClientIpResolver;

use std::net::IpAddr;

use store::AllowlistRepository;

#[derive(Debug, Clone)]
pub struct FirewallConfig {
    pub trust_proxy_headers: bool,
    pub trusted_proxy_cidrs: Vec<ipnet::IpNet>,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            trust_proxy_headers: false,
            trusted_proxy_cidrs: Vec::new(),
        }
    }
}

pub struct Firewall {
    allowlist: AllowlistRepository,
    resolver: ClientIpResolver,
}

impl Firewall {
    pub fn new(allowlist: AllowlistRepository, config: FirewallConfig) -> Self {
        Self {
            allowlist,
            resolver: ClientIpResolver::new(config),
        }
    }

    /// Resolve the effective client IP for one request and check it
    /// against the allowlist. `forwarded_for` is the raw
    /// `X-Forwarded-For` header value, if present.
    pub async fn check(&self, socket_peer: IpAddr, forwarded_for: Option<&str>) -> Result<IpAddr> {
        let client_ip = self.resolver.resolve(socket_peer, forwarded_for);

        let entries = self.allowlist.list_ip_addresses().await?;
        if entries.is_empty() {
            return Ok(client_ip);
        }

        let canonical = client_ip.to_string();
        if entries.iter().any(|entry| entry == &canonical) {
            Ok(client_ip)
        } else {
            Err(Error::Forbidden(client_ip))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn firewall(config: FirewallConfig) -> (Firewall, store::Store) {
        let store = store::Store::in_memory().await.unwrap();
        let firewall = Firewall::new(store.allowlist.clone(), config);
        (firewall, store)
    }

    #[tokio::test]
    async fn empty_allowlist_permits_any_ip() {
        let (firewall, _store) = firewall(FirewallConfig::default()).await;
        let result = firewall.check("203.0.113.5".parse().unwrap(), None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn non_empty_allowlist_blocks_foreign_ip() {
        let (firewall, store) = firewall(FirewallConfig::default()).await;
        store.allowlist.add("10.10.10.10").await.unwrap();

        let err = firewall.check("127.0.0.1".parse().unwrap(), None).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn non_empty_allowlist_permits_listed_ip() {
        let (firewall, store) = firewall(FirewallConfig::default()).await;
        store.allowlist.add("203.0.113.5").await.unwrap();

        let result = firewall.check("203.0.113.5".parse().unwrap(), None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn trusted_proxy_header_is_honored_for_client_resolution() {
        let config = FirewallConfig {
            trust_proxy_headers: true,
            trusted_proxy_cidrs: vec!["10.0.0.0/8".parse().unwrap()],
        };
        let (firewall, store) = firewall(config).await;
        store.allowlist.add("198.51.100.7").await.unwrap();

        let result = firewall.check("10.0.0.1".parse().unwrap(), Some("198.51.100.7, 10.0.0.1")).await;
        assert!(result.is_ok());
    }
}
