//! Persisted record shapes.

use chrono::NaiveDateTime;
use common::AccountStatus;
use serde::{Deserialize, Serialize};

/// The closed set of plan types the upstream reports. Anything outside
/// this set is coerced to [`PlanType::default`] at the store boundary —
/// the store never persists an arbitrary string as `plan_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Free,
    Plus,
    Pro,
    Team,
    Enterprise,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Free => "free",
            PlanType::Plus => "plus",
            PlanType::Pro => "pro",
            PlanType::Team => "team",
            PlanType::Enterprise => "enterprise",
        }
    }

    /// Coerce an upstream-reported plan string into the closed set,
    /// falling back to the default plan on anything unrecognized.
    pub fn coerce(raw: Option<&str>) -> Self {
        match raw {
            Some("free") => PlanType::Free,
            Some("plus") => PlanType::Plus,
            Some("pro") => PlanType::Pro,
            Some("team") => PlanType::Team,
            Some("enterprise") => PlanType::Enterprise,
            _ => PlanType::default(),
        }
    }
}

impl Default for PlanType {
    fn default() -> Self {
        PlanType::Plus
    }
}

/// A pre-authenticated upstream account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub chatgpt_account_id: Option<String>,
    pub email: Option<String>,
    pub plan_type: PlanType,
    pub access_token_encrypted: String,
    pub refresh_token_encrypted: String,
    pub id_token_encrypted: Option<String>,
    pub last_refresh: NaiveDateTime,
    pub status: AccountStatus,
    pub deactivation_reason: Option<String>,
    pub usage: UsageSnapshot,
    pub created_at: NaiveDateTime,
}

/// The latest known rate-limit/quota figures for an account.
/// `runtime_reset_at` is never persisted — it is the
/// balancer's in-memory overlay and is always `None` on a value freshly
/// loaded from the store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageSnapshot {
    pub primary_used_percent: Option<f64>,
    pub primary_reset_at: Option<i64>,
    pub primary_window_minutes: Option<i64>,
    pub secondary_used_percent: Option<f64>,
    pub secondary_reset_at: Option<i64>,
    pub credits_has: Option<bool>,
    pub credits_unlimited: Option<bool>,
    pub credits_balance: Option<f64>,
}

/// One row of the append-only usage history.
#[derive(Debug, Clone)]
pub struct UsageEntryWrite {
    pub account_id: String,
    pub used_percent: Option<f64>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub window: Option<String>,
    pub reset_at: Option<i64>,
    pub window_minutes: Option<i64>,
    pub credits_has: Option<bool>,
    pub credits_unlimited: Option<bool>,
    pub credits_balance: Option<f64>,
}

/// A sticky-session mapping.
#[derive(Debug, Clone)]
pub struct StickySession {
    pub key: String,
    pub account_id: String,
}

/// One allowed client IP. `ip_address` is always the
/// canonical `std::net::IpAddr` display form.
#[derive(Debug, Clone)]
pub struct AllowlistEntry {
    pub ip_address: String,
    pub created_at: NaiveDateTime,
}
