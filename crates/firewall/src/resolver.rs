//! Client-IP resolution: the socket peer by default, or the first entry
//! of `X-Forwarded-For` when the peer itself is a configured trusted
//! proxy. A malformed or unparsable forwarded value is treated as
//! untrusted input — the request falls back to the socket peer rather
//! than erroring.

use std::net::IpAddr;

use crate::FirewallConfig;

pub struct ClientIpResolver {
    config: FirewallConfig,
}

impl ClientIpResolver {
    pub fn new(config: FirewallConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, socket_peer: IpAddr, forwarded_for: Option<&str>) -> IpAddr {
        if !self.config.trust_proxy_headers {
            return socket_peer;
        }
        if !self.config.trusted_proxy_cidrs.iter().any(|cidr| cidr.contains(&socket_peer)) {
            return socket_peer;
        }
        let Some(header) = forwarded_for else { return socket_peer };
        let Some(first) = header.split(',').next() else { return socket_peer };
        first.trim().parse().unwrap_or(socket_peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(trust: bool, cidrs: &[&str]) -> ClientIpResolver {
        ClientIpResolver::new(FirewallConfig {
            trust_proxy_headers: trust,
            trusted_proxy_cidrs: cidrs.iter().map(|c| c.parse().unwrap()).collect(),
        })
    }

    #[test]
    fn untrusted_config_always_uses_socket_peer() {
        let r = resolver(false, &["10.0.0.0/8"]);
        let resolved = r.resolve("10.0.0.1".parse().unwrap(), Some("1.2.3.4"));
        assert_eq!(resolved, "10.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn peer_outside_trusted_cidrs_is_used_directly() {
        let r = resolver(true, &["10.0.0.0/8"]);
        let resolved = r.resolve("203.0.113.1".parse().unwrap(), Some("1.2.3.4"));
        assert_eq!(resolved, "203.0.113.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn trusted_peer_uses_first_forwarded_entry() {
        let r = resolver(true, &["10.0.0.0/8"]);
        let resolved = r.resolve("10.0.0.1".parse().unwrap(), Some("198.51.100.7, 10.0.0.1"));
        assert_eq!(resolved, "198.51.100.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn malformed_forwarded_entry_falls_back_to_peer() {
        let r = resolver(true, &["10.0.0.0/8"]);
        let resolved = r.resolve("10.0.0.1".parse().unwrap(), Some("not-an-ip"));
        assert_eq!(resolved, "10.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn missing_forwarded_header_falls_back_to_peer() {
        let r = resolver(true, &["10.0.0.0/8"]);
        let resolved = r.resolve("10.0.0.1".parse().unwrap(), None);
        assert_eq!(resolved, "10.0.0.1".parse::<IpAddr>().unwrap());
    }
}
