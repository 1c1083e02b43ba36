//! Rate-limit/quota state machine.
//!
//! Usage figures arrive both as response headers on a completed upstream
//! call and embedded in `response.completed`/`incomplete`/`failed` SSE
//! payloads; both paths are expected to construct a [`QuotaInput`] and call
//! [`apply_usage_quota`] — there is exactly one place this computation
//! happens.

use common::AccountStatus;

use crate::windows::default_window_minutes;

/// Inputs to one evaluation of the quota state machine. All timestamps are
/// epoch seconds (UTC).
#[derive(Debug, Clone, Copy)]
pub struct QuotaInput {
    pub status: AccountStatus,
    pub primary_used: Option<f64>,
    pub primary_reset: Option<i64>,
    pub primary_window_minutes: Option<i64>,
    pub runtime_reset: Option<i64>,
    pub secondary_used: Option<f64>,
    pub secondary_reset: Option<i64>,
    /// Current time, epoch seconds. Threaded explicitly rather than read
    /// from the clock so the state machine stays a pure function.
    pub now: i64,
}

/// Output of one evaluation: the account's new status, the headline used
/// percentage, and the reset timestamp the balancer should honor as a
/// cooldown deadline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaOutput {
    pub status: AccountStatus,
    pub used_percent: Option<f64>,
    pub reset_at: Option<i64>,
}

/// Apply the five-step quota/rate-limit state machine.
///
/// Step order is load-bearing: secondary (account-wide quota) takes
/// precedence over primary (rate limit), and an account never leaves
/// `DEACTIVATED`/`PAUSED` through this path.
pub fn apply_usage_quota(input: QuotaInput) -> QuotaOutput {
    let QuotaInput {
        status,
        primary_used,
        primary_reset,
        primary_window_minutes,
        runtime_reset,
        secondary_used,
        secondary_reset,
        now,
    } = input;

    let mut status = status;
    let mut used_percent = primary_used;
    let mut reset_at = runtime_reset;

    if matches!(status, AccountStatus::Deactivated | AccountStatus::Paused) {
        return QuotaOutput {
            status,
            used_percent,
            reset_at,
        };
    }

    match secondary_used {
        Some(secondary) if secondary >= 100.0 => {
            return QuotaOutput {
                status: AccountStatus::QuotaExceeded,
                used_percent: Some(100.0),
                reset_at: secondary_reset.or(runtime_reset),
            };
        }
        Some(_) if status == AccountStatus::QuotaExceeded => {
            if runtime_reset.is_some_and(|r| r > now) {
                // keep runtime_reset as-is
            } else {
                status = AccountStatus::Active;
                reset_at = None;
            }
        }
        None if status == AccountStatus::QuotaExceeded && secondary_reset.is_some() => {
            reset_at = secondary_reset;
        }
        _ => {}
    }

    if let Some(primary) = primary_used {
        if primary >= 100.0 {
            let reset = primary_reset.or_else(|| fallback_primary_reset(primary_window_minutes, now));
            return QuotaOutput {
                status: AccountStatus::RateLimited,
                used_percent: Some(100.0),
                reset_at: reset,
            };
        }
        if status == AccountStatus::RateLimited {
            match pending_reset(runtime_reset, primary_reset, now) {
                Some(pending) => reset_at = Some(pending),
                None => {
                    status = AccountStatus::Active;
                    reset_at = None;
                }
            }
        }
    }

    QuotaOutput {
        status,
        used_percent,
        reset_at,
    }
}

fn fallback_primary_reset(primary_window_minutes: Option<i64>, now: i64) -> Option<i64> {
    let window_minutes = primary_window_minutes.or_else(|| default_window_minutes("primary"))?;
    if window_minutes <= 0 {
        return None;
    }
    Some(now + window_minutes * 60)
}

fn pending_reset(runtime_reset: Option<i64>, window_reset: Option<i64>, now: i64) -> Option<i64> {
    if let Some(r) = runtime_reset {
        if r > now {
            return Some(r);
        }
    }
    if let Some(w) = window_reset {
        if w > now {
            return Some(w);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(now: i64) -> QuotaInput {
        QuotaInput {
            status: AccountStatus::Active,
            primary_used: None,
            primary_reset: None,
            primary_window_minutes: None,
            runtime_reset: None,
            secondary_used: None,
            secondary_reset: None,
            now,
        }
    }

    #[test]
    fn deactivated_passes_through_unchanged() {
        let input = QuotaInput {
            status: AccountStatus::Deactivated,
            primary_used: Some(100.0),
            ..base(1_700_000_000)
        };
        let out = apply_usage_quota(input);
        assert_eq!(out.status, AccountStatus::Deactivated);
    }

    #[test]
    fn paused_passes_through_unchanged() {
        let input = QuotaInput {
            status: AccountStatus::Paused,
            secondary_used: Some(100.0),
            ..base(1_700_000_000)
        };
        let out = apply_usage_quota(input);
        assert_eq!(out.status, AccountStatus::Paused);
    }

    #[test]
    fn s5_primary_saturated_sets_rate_limited() {
        let input = QuotaInput {
            primary_used: Some(100.0),
            primary_reset: Some(1_700_000_000),
            ..base(1_699_000_000)
        };
        let out = apply_usage_quota(input);
        assert_eq!(out.status, AccountStatus::RateLimited);
        assert_eq!(out.used_percent, Some(100.0));
        assert_eq!(out.reset_at, Some(1_700_000_000));
    }

    #[test]
    fn s5_rate_limited_recovers_when_resets_are_past() {
        let now = 1_700_000_000;
        let input = QuotaInput {
            status: AccountStatus::RateLimited,
            primary_used: Some(10.0),
            primary_reset: Some(now - 1),
            runtime_reset: Some(now - 1),
            ..base(now)
        };
        let out = apply_usage_quota(input);
        assert_eq!(out.status, AccountStatus::Active);
        assert_eq!(out.used_percent, Some(10.0));
        assert_eq!(out.reset_at, None);
    }

    #[test]
    fn secondary_saturated_wins_over_primary() {
        let input = QuotaInput {
            primary_used: Some(50.0),
            secondary_used: Some(100.0),
            secondary_reset: Some(1_800_000_000),
            ..base(1_700_000_000)
        };
        let out = apply_usage_quota(input);
        assert_eq!(out.status, AccountStatus::QuotaExceeded);
        assert_eq!(out.used_percent, Some(100.0));
        assert_eq!(out.reset_at, Some(1_800_000_000));
    }

    #[test]
    fn quota_exceeded_recovers_when_secondary_drops_and_runtime_reset_passed() {
        let now = 1_700_000_000;
        let input = QuotaInput {
            status: AccountStatus::QuotaExceeded,
            secondary_used: Some(20.0),
            runtime_reset: Some(now - 10),
            ..base(now)
        };
        let out = apply_usage_quota(input);
        assert_eq!(out.status, AccountStatus::Active);
        assert_eq!(out.reset_at, None);
    }

    #[test]
    fn quota_exceeded_stays_while_runtime_reset_future() {
        let now = 1_700_000_000;
        let input = QuotaInput {
            status: AccountStatus::QuotaExceeded,
            secondary_used: Some(20.0),
            runtime_reset: Some(now + 500),
            ..base(now)
        };
        let out = apply_usage_quota(input);
        assert_eq!(out.status, AccountStatus::QuotaExceeded);
        assert_eq!(out.reset_at, Some(now + 500));
    }

    #[test]
    fn quota_exceeded_with_only_secondary_reset_adopts_it() {
        let now = 1_700_000_000;
        let input = QuotaInput {
            status: AccountStatus::QuotaExceeded,
            secondary_reset: Some(now + 999),
            ..base(now)
        };
        let out = apply_usage_quota(input);
        assert_eq!(out.status, AccountStatus::QuotaExceeded);
        assert_eq!(out.reset_at, Some(now + 999));
    }

    #[test]
    fn primary_saturated_without_explicit_reset_falls_back_to_window() {
        let now = 1_700_000_000;
        let input = QuotaInput {
            primary_used: Some(100.0),
            primary_window_minutes: Some(60),
            ..base(now)
        };
        let out = apply_usage_quota(input);
        assert_eq!(out.status, AccountStatus::RateLimited);
        assert_eq!(out.reset_at, Some(now + 3600));
    }

    #[test]
    fn primary_saturated_uses_default_window_when_none_configured() {
        let now = 1_700_000_000;
        let input = QuotaInput {
            primary_used: Some(100.0),
            ..base(now)
        };
        let out = apply_usage_quota(input);
        assert_eq!(out.reset_at, Some(now + 300 * 60));
    }

    #[test]
    fn used_percent_is_always_in_bounds() {
        for primary in [0.0, 50.0, 99.9, 100.0, 150.0] {
            let input = QuotaInput {
                primary_used: Some(primary),
                ..base(1_700_000_000)
            };
            let out = apply_usage_quota(input);
            let used = out.used_percent.unwrap();
            assert!((0.0..=100.0).contains(&used), "used={used}");
        }
    }

    #[test]
    fn no_usage_data_leaves_status_unchanged() {
        let out = apply_usage_quota(base(1_700_000_000));
        assert_eq!(out.status, AccountStatus::Active);
        assert_eq!(out.used_percent, None);
        assert_eq!(out.reset_at, None);
    }
}
