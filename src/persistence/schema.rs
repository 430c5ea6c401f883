//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` and are applied
//! on every startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS lead (
    id              TEXT PRIMARY KEY NOT NULL,
    first_name      TEXT,
    last_name       TEXT,
    email           TEXT,
    phone           TEXT,
    company         TEXT,
    address         TEXT,
    attempt_count   INTEGER NOT NULL DEFAULT 0 CHECK(attempt_count >= 0),
    last_outcome    TEXT CHECK(last_outcome IN ('not_answered','converted','declined','unreachable','callback_scheduled')),
    status          TEXT NOT NULL CHECK(status IN ('queued','suspended','closed')),
    terminal_reason TEXT CHECK(terminal_reason IN ('converted','declined','unreachable')),
    source          TEXT,
    origin_label    TEXT,
    arrived_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    closed_at       TEXT
);

CREATE TABLE IF NOT EXISTS pending_callback (
    lead_id         TEXT PRIMARY KEY NOT NULL REFERENCES lead(id) ON DELETE CASCADE,
    offset_days     INTEGER NOT NULL CHECK(offset_days > 0),
    reentry_at      TEXT NOT NULL,
    scheduled_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS outreach_request (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    lead_id         TEXT NOT NULL REFERENCES lead(id) ON DELETE CASCADE,
    email           TEXT,
    requested_at    TEXT NOT NULL,
    dispatched_at   TEXT
);

CREATE INDEX IF NOT EXISTS idx_lead_status_arrived ON lead(status, arrived_at);
CREATE INDEX IF NOT EXISTS idx_callback_reentry ON pending_callback(reentry_at);
CREATE INDEX IF NOT EXISTS idx_outreach_lead ON outreach_request(lead_id);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
