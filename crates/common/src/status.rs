//! The account lifecycle status shared by the store, quota, and balancer
//! crates.

use serde::{Deserialize, Serialize};

/// One of the five declared account lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    RateLimited,
    QuotaExceeded,
    Paused,
    Deactivated,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::RateLimited => "RATE_LIMITED",
            AccountStatus::QuotaExceeded => "QUOTA_EXCEEDED",
            AccountStatus::Paused => "PAUSED",
            AccountStatus::Deactivated => "DEACTIVATED",
        }
    }

    pub fn from_str_opt(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(AccountStatus::Active),
            "RATE_LIMITED" => Some(AccountStatus::RateLimited),
            "QUOTA_EXCEEDED" => Some(AccountStatus::QuotaExceeded),
            "PAUSED" => Some(AccountStatus::Paused),
            "DEACTIVATED" => Some(AccountStatus::Deactivated),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for status in [
            AccountStatus::Active,
            AccountStatus::RateLimited,
            AccountStatus::QuotaExceeded,
            AccountStatus::Paused,
            AccountStatus::Deactivated,
        ] {
            assert_eq!(AccountStatus::from_str_opt(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_string_is_none() {
        assert_eq!(AccountStatus::from_str_opt("BOGUS"), None);
    }
}
