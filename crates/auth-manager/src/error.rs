//! Errors surfaced while keeping an account's OAuth tokens fresh.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The refresh grant was rejected and the account has been
    /// deactivated in the store. The caller should drop the account from
    /// its candidate set and try another.
    #[error("account deactivated during refresh: {reason}")]
    Deactivated { reason: String },

    /// A transient refresh failure (network error, 5xx, malformed
    /// response). The account's existing tokens are left untouched.
    #[error("refresh failed: {0}")]
    RefreshFailed(#[from] oauth_client::Error),

    #[error(transparent)]
    Crypto(#[from] crypto::Error),

    #[error(transparent)]
    Store(#[from] store::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
