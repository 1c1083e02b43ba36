//! SQLite-backed persistence for accounts, sticky sessions, the firewall
//! allowlist, and usage history.
//!
//! Queries are written by hand against `sqlx::query`/`query_as` rather
//! than the `query!` compile-time macro — there is no database available
//! at build time in this workspace's CI, only at runtime.

mod accounts;
mod error;
mod firewall;
mod migrate;
mod models;
mod settings;
mod sticky;
mod usage;

pub use accounts::AccountsRepository;
pub use error::{Error, Result};
pub use firewall::AllowlistRepository;
pub use models::{Account, AllowlistEntry, PlanType, StickySession, UsageEntryWrite, UsageSnapshot};
pub use settings::{DashboardSettings, SettingsRepository};
pub use sticky::StickySessionsRepository;
pub use usage::UsageEntriesWriter;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// An open connection pool plus every repository built on top of it.
/// Constructed once at startup and cloned (cheaply — every field is an
/// `Arc`-backed handle) into whichever components need it.
#[derive(Clone)]
pub struct Store {
    pub accounts: AccountsRepository,
    pub sticky_sessions: StickySessionsRepository,
    pub allowlist: AllowlistRepository,
    pub usage_entries: UsageEntriesWriter,
    pub settings: SettingsRepository,
}

impl Store {
    /// Open (creating if absent) the SQLite database at `database_url`
    /// and run every pending migration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        migrate::run(&pool).await?;
        Ok(Self {
            accounts: AccountsRepository::new(pool.clone()),
            sticky_sessions: StickySessionsRepository::new(pool.clone()),
            allowlist: AllowlistRepository::new(pool.clone()),
            usage_entries: UsageEntriesWriter::new(pool.clone()),
            settings: SettingsRepository::new(pool),
        })
    }

    /// An in-memory database for tests — in this crate and in downstream
    /// crates exercising code that depends on a [`Store`].
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::from_pool(pool).await
    }
}
