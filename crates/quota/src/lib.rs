//! Rate-limit/quota accounting.
//!
//! This crate is the one place the quota state machine lives. It has no
//! I/O surface: callers parse usage figures out of response headers or SSE
//! payloads (in `upstream-client`/the orchestrator) and hand them here as a
//! [`QuotaInput`].

mod state_machine;
mod windows;

pub use state_machine::{QuotaInput, QuotaOutput, apply_usage_quota};
pub use windows::default_window_minutes;
