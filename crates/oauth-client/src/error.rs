//! Error types for the OAuth refresh-grant client.

/// Errors from a refresh-grant attempt against the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("refresh request failed: {0}")]
    Http(String),

    /// The response body could not be parsed or was missing required tokens.
    /// Always treated as non-permanent by callers.
    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    /// A refresh attempt rejected by the provider with a classified failure
    /// code. `is_permanent` mirrors the classifier in [`crate::classify`].
    #[error("refresh rejected ({code}): {message}")]
    Rejected {
        code: String,
        message: String,
        is_permanent: bool,
    },
}

impl Error {
    /// Whether this failure should deactivate the account (vs. a retryable
    /// transient condition).
    pub fn is_permanent(&self) -> bool {
        matches!(self, Error::Rejected { is_permanent: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
