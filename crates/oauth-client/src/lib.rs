//! OAuth refresh-grant client for the upstream identity provider.
//!
//! This crate is deliberately narrow: it performs only the refresh grant.
//! Authorization-code exchange and device-code
//! enrollment belong to the dashboard's OAuth collaborator and are not
//! implemented here.
//!
//! Flow:
//! 1. [`freshness::should_refresh`] decides whether a refresh is due.
//! 2. [`token::refresh_token`] performs the grant and returns updated
//!    tokens plus any metadata recovered from the id token's claims.
//! 3. The caller (the `auth-manager` crate) persists the result through
//!    the account store and maps permanent failures to deactivation.

pub mod claims;
pub mod error;
pub mod freshness;
pub mod token;

pub use claims::{IdTokenClaims, extract_id_token_claims};
pub use error::{Error, Result};
pub use freshness::{DEFAULT_REFRESH_INTERVAL_DAYS, should_refresh};
pub use token::{RefreshedTokens, refresh_token};
