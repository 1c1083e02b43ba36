//! HTTP client for the upstream `responses` endpoint: POSTs the canonical
//! payload, exposes the raw SSE frame stream, and (optionally) fetches
//! remote images into inline `data:` URLs under a safe-fetch policy.

mod client;
mod error;
mod safe_fetch;
mod sse;

pub use client::{EventStream, UpstreamClient, UpstreamResponse};
pub use error::{Error, Result};
pub use safe_fetch::{SafeFetchConfig, SafeFetchError, fetch_inline_image};
pub use sse::{event_stream, format_sse_event};
