//! Errors for the API firewall.

use std::net::IpAddr;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The resolved client IP is not in a non-empty allowlist.
    #[error("ip {0} is not in the allowlist")]
    Forbidden(IpAddr),

    #[error(transparent)]
    Store(#[from] store::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
