//! Persistence layer modules.

pub mod callback_repo;
pub mod db;
pub mod lead_repo;
pub mod outreach_repo;
pub mod retention;
pub mod schema;
pub mod store;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{AppError, Result};

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;

/// Format a timestamp for storage.
///
/// Fixed-width UTC so that lexical order in `SQLite` matches time order.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp, naming the column on failure.
pub(crate) fn parse_ts(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Db(format!("invalid {column}: {e}")))
}

/// Parse an optional stored timestamp.
pub(crate) fn parse_opt_ts(raw: Option<&str>, column: &str) -> Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(s, column)).transpose()
}
