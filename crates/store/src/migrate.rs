//! Schema creation and additive migrations.
//!
//! Tables are created with `CREATE TABLE IF NOT EXISTS` against the
//! current shape, then a handful of `ensure_column` calls backfill any
//! column a pre-existing database file (created by an older binary)
//! might be missing. There is no migration framework and no down
//! migrations: a column is only ever added, never renamed or dropped.

use sqlx::{Row, SqlitePool};

use crate::error::Result;

const CREATE_ACCOUNTS: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id                      TEXT PRIMARY KEY,
    chatgpt_account_id      TEXT,
    email                   TEXT,
    plan_type               TEXT NOT NULL DEFAULT 'plus',
    access_token_encrypted  TEXT NOT NULL,
    refresh_token_encrypted TEXT NOT NULL,
    id_token_encrypted      TEXT,
    last_refresh            TEXT NOT NULL,
    status                  TEXT NOT NULL DEFAULT 'ACTIVE',
    deactivation_reason     TEXT,
    primary_used_percent    REAL,
    primary_reset_at        INTEGER,
    primary_window_minutes  INTEGER,
    secondary_used_percent  REAL,
    secondary_reset_at      INTEGER,
    credits_has             INTEGER,
    credits_unlimited       INTEGER,
    credits_balance         REAL,
    created_at              TEXT NOT NULL
)";

const CREATE_USAGE_ENTRIES: &str = "
CREATE TABLE IF NOT EXISTS usage_entries (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id      TEXT NOT NULL,
    used_percent    REAL,
    input_tokens    INTEGER,
    output_tokens   INTEGER,
    window          TEXT,
    reset_at        INTEGER,
    window_minutes  INTEGER,
    credits_has     INTEGER,
    credits_unlimited INTEGER,
    credits_balance REAL,
    recorded_at     TEXT NOT NULL
)";

const CREATE_STICKY_SESSIONS: &str = "
CREATE TABLE IF NOT EXISTS sticky_sessions (
    key        TEXT PRIMARY KEY,
    account_id TEXT NOT NULL
)";

const CREATE_FIREWALL_ALLOWLIST: &str = "
CREATE TABLE IF NOT EXISTS api_firewall_allowlist (
    ip_address TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
)";

const CREATE_DASHBOARD_SETTINGS: &str = "
CREATE TABLE IF NOT EXISTS dashboard_settings (
    id                            INTEGER PRIMARY KEY CHECK (id = 1),
    sticky_threads_enabled        INTEGER NOT NULL DEFAULT 0,
    prefer_earlier_reset_accounts INTEGER NOT NULL DEFAULT 0,
    totp_required_on_login        INTEGER NOT NULL DEFAULT 0,
    totp_secret_encrypted         TEXT
)";

const CREATE_REQUEST_LOGS: &str = "
CREATE TABLE IF NOT EXISTS request_logs (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id       TEXT,
    account_id       TEXT,
    model            TEXT,
    reasoning_effort TEXT,
    created_at       TEXT NOT NULL
)";

/// Create every table the store needs, then backfill any column an
/// older on-disk database is missing.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    for stmt in [
        CREATE_ACCOUNTS,
        CREATE_USAGE_ENTRIES,
        CREATE_STICKY_SESSIONS,
        CREATE_FIREWALL_ALLOWLIST,
        CREATE_DASHBOARD_SETTINGS,
        CREATE_REQUEST_LOGS,
    ] {
        sqlx::query(stmt).execute(pool).await?;
    }

    ensure_column(pool, "accounts", "deactivation_reason", "TEXT").await?;
    ensure_column(pool, "accounts", "credits_balance", "REAL").await?;
    ensure_column(pool, "request_logs", "reasoning_effort", "TEXT").await?;

    Ok(())
}

async fn ensure_column(pool: &SqlitePool, table: &str, column: &str, sql_type: &str) -> Result<()> {
    let pragma = format!("PRAGMA table_info({table})");
    let rows = sqlx::query(&pragma).fetch_all(pool).await?;
    let exists = rows
        .iter()
        .any(|row| row.try_get::<String, _>("name").map(|name| name == column).unwrap_or(false));
    if exists {
        return Ok(());
    }
    tracing::info!(table, column, "adding missing column");
    let alter = format!("ALTER TABLE {table} ADD COLUMN {column} {sql_type}");
    sqlx::query(&alter).execute(pool).await?;
    Ok(())
}
