//! Errors for the account store and its sibling repositories.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("account not found: {0}")]
    NotFound(String),

    /// Distinct from "not found" so the firewall's add-IP path can return
    /// a 409-shaped conflict instead of a generic 500.
    #[error("already exists: {0}")]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, Error>;
