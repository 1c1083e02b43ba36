//! Extracts rate-limit/quota figures from an upstream call and feeds them
//! through the quota state machine, persisting the result and updating
//! the balancer's cooldown overlay.
//!
//! Usage arrives two ways (§4.D): response headers on the call that
//! opened the stream, and embedded in `response.completed|incomplete|
//! failed` SSE events further into the same stream. Both paths build the
//! same [`Harvested`] shape and converge on [`apply_and_persist`] — there
//! is exactly one place the state machine is invoked from.
//!
//! The upstream's exact header names and completed-event usage shape
//! aren't pinned by the specification; the names below follow the
//! `primary`/`secondary` window vocabulary the quota crate already uses
//! and are intentionally confined to this one module.

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default)]
pub struct Harvested {
    pub primary_used: Option<f64>,
    pub primary_reset: Option<i64>,
    pub primary_window_minutes: Option<i64>,
    pub secondary_used: Option<f64>,
    pub secondary_reset: Option<i64>,
}

impl Harvested {
    pub fn is_empty(&self) -> bool {
        self.primary_used.is_none() && self.secondary_used.is_none()
    }
}

const HEADER_PRIMARY_USED: &str = "x-codex-primary-used-percent";
const HEADER_PRIMARY_RESET: &str = "x-codex-primary-reset-at";
const HEADER_PRIMARY_WINDOW_MINUTES: &str = "x-codex-primary-window-minutes";
const HEADER_SECONDARY_USED: &str = "x-codex-secondary-used-percent";
const HEADER_SECONDARY_RESET: &str = "x-codex-secondary-reset-at";

pub fn from_headers(headers: &HeaderMap) -> Harvested {
    Harvested {
        primary_used: header_f64(headers, HEADER_PRIMARY_USED),
        primary_reset: header_i64(headers, HEADER_PRIMARY_RESET),
        primary_window_minutes: header_i64(headers, HEADER_PRIMARY_WINDOW_MINUTES),
        secondary_used: header_f64(headers, HEADER_SECONDARY_USED),
        secondary_reset: header_i64(headers, HEADER_SECONDARY_RESET),
    }
}

fn header_f64(headers: &HeaderMap, name: &str) -> Option<f64> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

/// Pull usage figures out of a `response.completed|incomplete|failed`
/// event's `response.rate_limits.{primary,secondary}` object. Returns
/// `None` for any other event type, or one that carries no usage data.
pub fn from_event(event: &Value) -> Option<Harvested> {
    let event_type = event.get("type").and_then(Value::as_str)?;
    if !matches!(event_type, "response.completed" | "response.incomplete" | "response.failed") {
        return None;
    }
    let rate_limits = event.get("response")?.get("rate_limits")?;
    let primary = rate_limits.get("primary");
    let secondary = rate_limits.get("secondary");

    let harvested = Harvested {
        primary_used: primary.and_then(|p| p.get("used_percent")).and_then(Value::as_f64),
        primary_reset: primary.and_then(|p| p.get("reset_at")).and_then(Value::as_i64),
        primary_window_minutes: primary.and_then(|p| p.get("window_minutes")).and_then(Value::as_i64),
        secondary_used: secondary.and_then(|s| s.get("used_percent")).and_then(Value::as_f64),
        secondary_reset: secondary.and_then(|s| s.get("reset_at")).and_then(Value::as_i64),
    };
    if harvested.is_empty() { None } else { Some(harvested) }
}

/// Run the quota state machine over `harvested`, persist the resulting
/// snapshot/status, record a usage-history row, and reconcile the
/// balancer's in-memory cooldown overlay.
pub async fn apply_and_persist(state: &AppState, account: &store::Account, harvested: Harvested, now_unix: i64) -> Result<(), AppError> {
    if harvested.is_empty() {
        return Ok(());
    }

    let input = quota::QuotaInput {
        status: account.status,
        primary_used: harvested.primary_used,
        primary_reset: harvested.primary_reset,
        primary_window_minutes: harvested.primary_window_minutes,
        runtime_reset: account.usage.primary_reset_at,
        secondary_used: harvested.secondary_used,
        secondary_reset: harvested.secondary_reset,
        now: now_unix,
    };
    let output = quota::apply_usage_quota(input);

    let mut usage = account.usage;
    if harvested.primary_used.is_some() {
        usage.primary_used_percent = output.used_percent;
        usage.primary_reset_at = output.reset_at;
        usage.primary_window_minutes = harvested.primary_window_minutes.or(usage.primary_window_minutes);
    }
    if harvested.secondary_used.is_some() {
        usage.secondary_used_percent = harvested.secondary_used;
        usage.secondary_reset_at = harvested.secondary_reset.or(output.reset_at);
    }

    state.store.accounts.update_usage(&account.id, &usage).await?;
    state
        .store
        .usage_entries
        .append(&store::UsageEntryWrite {
            account_id: account.id.clone(),
            used_percent: output.used_percent,
            input_tokens: None,
            output_tokens: None,
            window: Some(if harvested.secondary_used.is_some() { "secondary" } else { "primary" }.to_string()),
            reset_at: output.reset_at,
            window_minutes: usage.primary_window_minutes,
            credits_has: usage.credits_has,
            credits_unlimited: usage.credits_unlimited,
            credits_balance: usage.credits_balance,
        })
        .await?;

    if output.status != account.status {
        state.store.accounts.update_status(&account.id, output.status, None).await?;
    }

    match output.status {
        common::AccountStatus::Active => state.balancer.clear_cooldown(&account.id),
        common::AccountStatus::RateLimited | common::AccountStatus::QuotaExceeded => {
            state.balancer.report_transient(&account.id, output.reset_at, now_unix);
        }
        _ => {}
    }

    Ok(())
}
