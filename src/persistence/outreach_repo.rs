//! Email outreach outbox repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::outreach::OutreachRequest;
use crate::{AppError, Result};

use super::db::Database;
use super::{format_ts, parse_opt_ts, parse_ts};

/// Repository wrapper around `SQLite` for outreach outbox rows.
#[derive(Clone)]
pub struct OutreachRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct OutreachRow {
    id: i64,
    lead_id: String,
    email: Option<String>,
    requested_at: String,
    dispatched_at: Option<String>,
}

impl OutreachRow {
    fn into_request(self) -> Result<OutreachRequest> {
        Ok(OutreachRequest {
            id: self.id,
            lead_id: self.lead_id,
            email: self.email,
            requested_at: parse_ts(&self.requested_at, "requested_at")?,
            dispatched_at: parse_opt_ts(self.dispatched_at.as_deref(), "dispatched_at")?,
        })
    }
}

/// Append an outreach request on an open connection.
pub(crate) async fn insert_on(
    conn: &mut SqliteConnection,
    lead_id: &str,
    email: Option<&str>,
    requested_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("INSERT INTO outreach_request (lead_id, email, requested_at) VALUES (?1, ?2, ?3)")
        .bind(lead_id)
        .bind(email)
        .bind(format_ts(requested_at))
        .execute(&mut *conn)
        .await?;

    Ok(())
}

impl OutreachRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// List requests not yet picked up by the notifier, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_pending(&self) -> Result<Vec<OutreachRequest>> {
        let rows: Vec<OutreachRow> = sqlx::query_as(
            "SELECT * FROM outreach_request WHERE dispatched_at IS NULL ORDER BY id ASC",
        )
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(OutreachRow::into_request).collect()
    }

    /// Mark a request as handed to the notifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no undispatched request has that id.
    /// Returns `AppError::Db` if the update fails.
    pub async fn mark_dispatched(&self, id: i64, now: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE outreach_request SET dispatched_at = ?1 WHERE id = ?2 AND dispatched_at IS NULL",
        )
        .bind(format_ts(now))
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "pending outreach request {id} not found"
            )));
        }
        Ok(())
    }
}
