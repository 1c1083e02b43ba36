//! Upstream-dictated mapping from a rate-limit window name to its default
//! duration in minutes, consulted only when the upstream omits an explicit
//! window length for the primary quota. Kept as a small constant table so
//! a new upstream window shape can be supported without touching
//! [`crate::apply_usage_quota`].

/// `(window_name, default_minutes)`.
const DEFAULT_WINDOWS: &[(&str, i64)] = &[("primary", 300), ("secondary", 10_080)];

/// The default window length, in minutes, for a named rate-limit window.
/// Returns `None` for an unrecognized window name.
pub fn default_window_minutes(window: &str) -> Option<i64> {
    DEFAULT_WINDOWS
        .iter()
        .find(|(name, _)| *name == window)
        .map(|(_, minutes)| *minutes)
}
