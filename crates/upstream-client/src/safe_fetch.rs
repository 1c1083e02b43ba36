//! SSRF-safe fetching of remote `image_url` parts into inline `data:`
//! URLs.
//!
//! Checks run in this order: scheme must be `https`; if the host is
//! already a literal IP it is checked directly against the blocked-range
//! table; otherwise the host is resolved via DNS and *every* resolved
//! address is checked (blocking a hostname that resolves even partially
//! into a blocked range); an optional hostname allowlist, when
//! configured, is consulted before the network checks run. The body is
//! read in bounded chunks and the fetch is aborted the instant the byte
//! budget is exceeded, so a misbehaving or hostile server can never force
//! an unbounded buffer.

use std::net::IpAddr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures::StreamExt;
use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct SafeFetchConfig {
    pub enabled: bool,
    pub max_bytes: usize,
    /// Empty = no restriction beyond the SSRF checks below.
    pub allowed_hosts: Vec<String>,
    pub connect_timeout: std::time::Duration,
}

impl Default for SafeFetchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_bytes: 8 * 1024 * 1024,
            allowed_hosts: Vec::new(),
            connect_timeout: std::time::Duration::from_secs(5),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SafeFetchError {
    #[error("inline image fetching is disabled")]
    Disabled,
    #[error("url must use https")]
    NonHttpsScheme,
    #[error("url has no host")]
    MissingHost,
    #[error("host is not in the configured allowlist")]
    HostNotAllowed,
    #[error("host resolves to a blocked address range")]
    BlockedAddress,
    #[error("dns resolution failed: {0}")]
    DnsResolution(String),
    #[error("fetch failed: {0}")]
    Http(String),
    #[error("response exceeded the inline size budget")]
    TooLarge,
}

fn blocked_networks() -> &'static [IpNet] {
    use std::sync::OnceLock;
    static NETS: OnceLock<Vec<IpNet>> = OnceLock::new();
    NETS.get_or_init(|| {
        [
            "127.0.0.0/8",
            "169.254.0.0/16",
            "10.0.0.0/8",
            "172.16.0.0/12",
            "192.168.0.0/16",
            "100.64.0.0/10",
            "::1/128",
            "fe80::/10",
            "fc00::/7",
        ]
        .iter()
        .map(|s| s.parse().expect("static CIDR literal parses"))
        .collect()
    })
}

fn is_blocked(ip: IpAddr) -> bool {
    if ip == "169.254.169.254".parse::<IpAddr>().unwrap() {
        return true;
    }
    blocked_networks().iter().any(|net| net.contains(&ip))
}

/// Validate `url` against the safe-fetch policy without performing any
/// network I/O other than (when the host is a name, not a literal IP)
/// DNS resolution.
pub async fn validate_url(url: &reqwest::Url, config: &SafeFetchConfig) -> Result<(), SafeFetchError> {
    if !config.enabled {
        return Err(SafeFetchError::Disabled);
    }
    if url.scheme() != "https" {
        return Err(SafeFetchError::NonHttpsScheme);
    }
    let host = url.host_str().ok_or(SafeFetchError::MissingHost)?;

    if !config.allowed_hosts.is_empty() && !config.allowed_hosts.iter().any(|h| h == host) {
        return Err(SafeFetchError::HostNotAllowed);
    }

    if let Ok(literal) = host.parse::<IpAddr>() {
        if is_blocked(literal) {
            return Err(SafeFetchError::BlockedAddress);
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| SafeFetchError::DnsResolution(e.to_string()))?;
    let mut any = false;
    for addr in addrs {
        any = true;
        if is_blocked(addr.ip()) {
            return Err(SafeFetchError::BlockedAddress);
        }
    }
    if !any {
        return Err(SafeFetchError::DnsResolution("no addresses returned".to_string()));
    }
    Ok(())
}

/// Fetch `url` under the safe-fetch policy and return it re-encoded as a
/// `data:` URL. The body is read chunk-by-chunk and the fetch is
/// cancelled as soon as `config.max_bytes` would be exceeded.
pub async fn fetch_inline_image(http: &reqwest::Client, url: &str, config: &SafeFetchConfig) -> Result<String, SafeFetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| SafeFetchError::MissingHost)?;
    validate_url(&parsed, config).await?;

    let response = http
        .get(parsed)
        .timeout(config.connect_timeout)
        .send()
        .await
        .map_err(|e| SafeFetchError::Http(e.to_string()))?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk.map_err(|e| SafeFetchError::Http(e.to_string()))?;
        if body.len() + chunk.len() > config.max_bytes {
            return Err(SafeFetchError::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }

    Ok(format!("data:{content_type};base64,{}", BASE64.encode(&body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> SafeFetchConfig {
        SafeFetchConfig {
            enabled: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn disabled_feature_rejects_everything() {
        let url = reqwest::Url::parse("https://example.com/a.png").unwrap();
        let err = validate_url(&url, &SafeFetchConfig::default()).await.unwrap_err();
        assert_eq!(err, SafeFetchError::Disabled);
    }

    #[tokio::test]
    async fn non_https_scheme_is_rejected() {
        let url = reqwest::Url::parse("http://example.com/a.png").unwrap();
        let err = validate_url(&url, &enabled()).await.unwrap_err();
        assert_eq!(err, SafeFetchError::NonHttpsScheme);
    }

    #[tokio::test]
    async fn loopback_literal_ip_is_blocked() {
        let url = reqwest::Url::parse("https://127.0.0.1/a.png").unwrap();
        let err = validate_url(&url, &enabled()).await.unwrap_err();
        assert_eq!(err, SafeFetchError::BlockedAddress);
    }

    #[tokio::test]
    async fn link_local_metadata_address_is_blocked() {
        let url = reqwest::Url::parse("https://169.254.169.254/latest/meta-data").unwrap();
        let err = validate_url(&url, &enabled()).await.unwrap_err();
        assert_eq!(err, SafeFetchError::BlockedAddress);
    }

    #[tokio::test]
    async fn private_range_literal_ip_is_blocked() {
        for literal in ["10.1.2.3", "172.16.0.5", "192.168.1.1", "100.64.0.1"] {
            let url = reqwest::Url::parse(&format!("https://{literal}/a.png")).unwrap();
            let err = validate_url(&url, &enabled()).await.unwrap_err();
            assert_eq!(err, SafeFetchError::BlockedAddress, "{literal} should be blocked");
        }
    }

    #[tokio::test]
    async fn allowlist_rejects_hosts_not_listed() {
        let config = SafeFetchConfig {
            enabled: true,
            allowed_hosts: vec!["cdn.example.com".to_string()],
            ..Default::default()
        };
        let url = reqwest::Url::parse("https://127.0.0.1/a.png").unwrap();
        let err = validate_url(&url, &config).await.unwrap_err();
        assert_eq!(err, SafeFetchError::HostNotAllowed);
    }

    #[test]
    fn ipv6_loopback_and_link_local_are_blocked() {
        assert!(is_blocked("::1".parse().unwrap()));
        assert!(is_blocked("fe80::1".parse().unwrap()));
        assert!(is_blocked("fc00::1".parse().unwrap()));
    }

    #[test]
    fn public_addresses_are_not_blocked() {
        assert!(!is_blocked("8.8.8.8".parse().unwrap()));
        assert!(!is_blocked("2001:4860:4860::8888".parse().unwrap()));
    }
}
