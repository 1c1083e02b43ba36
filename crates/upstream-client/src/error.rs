//! Errors for the upstream HTTP client and the inline-image safe-fetch
//! helper.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("upstream request failed: {0}")]
    Http(String),

    /// A pre-stream HTTP status >= 400, carrying the upstream's raw body
    /// so the orchestrator can render it through the standard error
    /// envelope.
    #[error("upstream returned {status}")]
    ProxyResponse { status: u16, body: bytes::Bytes },

    #[error("malformed SSE payload: {0}")]
    MalformedEvent(String),
}

pub type Result<T> = std::result::Result<T, Error>;
