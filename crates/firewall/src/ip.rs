//! Canonical IP string form, used both to validate allowlist entries on
//! write and to compare a resolved client IP against them on read.

use std::net::IpAddr;

/// Parse `raw` and re-render it in `std::net::IpAddr`'s canonical
/// `Display` form (dotted-decimal for IPv4, compressed form for IPv6).
/// Returns `None` if `raw` does not parse as an IP address at all —
/// this is the idempotence invariant: normalizing an already-canonical
/// string yields the same string back.
pub fn normalize_ip(raw: &str) -> Option<String> {
    raw.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_decimal_round_trips() {
        assert_eq!(normalize_ip("203.0.113.5"), Some("203.0.113.5".to_string()));
    }

    #[test]
    fn ipv6_collapses_to_compressed_form() {
        assert_eq!(normalize_ip("2001:0db8:0000:0000:0000:0000:0000:0001"), Some("2001:db8::1".to_string()));
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_ip("2001:0db8::0001").unwrap();
        let twice = normalize_ip(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn garbage_input_does_not_parse() {
        assert_eq!(normalize_ip("not-an-ip"), None);
        assert_eq!(normalize_ip("999.999.999.999"), None);
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(normalize_ip("  203.0.113.5  "), Some("203.0.113.5".to_string()));
    }
}
