//! The proactive-refresh freshness rule: `now - last_refresh > N days`.

use std::time::Duration;

/// Default refresh interval when configuration doesn't override it.
pub const DEFAULT_REFRESH_INTERVAL_DAYS: i64 = 8;

/// Whether an account's tokens are stale enough to warrant a proactive
/// refresh, given the last refresh timestamp (unix seconds, UTC) and the
/// configured interval.
pub fn should_refresh(last_refresh_unix: i64, now_unix: i64, interval_days: i64) -> bool {
    let interval = Duration::from_secs((interval_days.max(0) as u64) * 86_400);
    let elapsed = now_unix.saturating_sub(last_refresh_unix);
    elapsed > 0 && Duration::from_secs(elapsed as u64) > interval
}
