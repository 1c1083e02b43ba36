//! Errors for account selection and failure reporting.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Every candidate is deactivated or in cooldown. Carries a
    /// user-visible message; the orchestrator renders this as a
    /// 503-class response.
    #[error("no accounts available: {0}")]
    NoAccounts(String),

    #[error(transparent)]
    Store(#[from] store::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
