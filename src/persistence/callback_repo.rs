//! Pending callback repository for `SQLite` persistence.
//!
//! Keyed by `lead_id`: writing a callback for a lead that already has one
//! replaces it, so a lead never carries more than one pending re-entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::callback::PendingCallback;
use crate::{AppError, Result};

use super::db::Database;
use super::{format_ts, parse_ts};

/// Repository wrapper around `SQLite` for pending callback records.
#[derive(Clone)]
pub struct CallbackRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct CallbackRow {
    lead_id: String,
    offset_days: i64,
    reentry_at: String,
    scheduled_at: String,
}

impl CallbackRow {
    /// Convert a database row into the domain model.
    fn into_callback(self) -> Result<PendingCallback> {
        let offset_days = u32::try_from(self.offset_days)
            .map_err(|e| AppError::Db(format!("invalid offset_days: {e}")))?;
        Ok(PendingCallback {
            lead_id: self.lead_id,
            offset_days,
            reentry_at: parse_ts(&self.reentry_at, "reentry_at")?,
            scheduled_at: parse_ts(&self.scheduled_at, "scheduled_at")?,
        })
    }
}

/// Insert or replace the pending callback on an open connection.
///
/// Used directly by the disposition transaction.
pub(crate) async fn upsert_on(conn: &mut SqliteConnection, callback: &PendingCallback) -> Result<()> {
    sqlx::query(
        "INSERT INTO pending_callback (lead_id, offset_days, reentry_at, scheduled_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(lead_id) DO UPDATE SET
             offset_days = excluded.offset_days,
             reentry_at = excluded.reentry_at,
             scheduled_at = excluded.scheduled_at",
    )
    .bind(&callback.lead_id)
    .bind(i64::from(callback.offset_days))
    .bind(format_ts(callback.reentry_at))
    .bind(format_ts(callback.scheduled_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl CallbackRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a callback, overwriting any pending one for the same lead.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    pub async fn upsert(&self, callback: &PendingCallback) -> Result<()> {
        let mut conn = self.db.acquire().await?;
        upsert_on(&mut conn, callback).await
    }

    /// Replace the pending callback of a suspended lead.
    ///
    /// Returns `false`, writing nothing, if the lead is not suspended.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the read or write fails.
    pub async fn replace_for_suspended(&self, callback: &PendingCallback) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        let status: Option<String> = sqlx::query_scalar("SELECT status FROM lead WHERE id = ?1")
            .bind(&callback.lead_id)
            .fetch_optional(&mut *tx)
            .await?;
        if status.as_deref() != Some("suspended") {
            return Ok(false);
        }

        upsert_on(&mut tx, callback).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Retrieve the pending callback for a lead, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_for_lead(&self, lead_id: &str) -> Result<Option<PendingCallback>> {
        let row: Option<CallbackRow> =
            sqlx::query_as("SELECT * FROM pending_callback WHERE lead_id = ?1")
                .bind(lead_id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(CallbackRow::into_callback).transpose()
    }

    /// List callbacks whose re-entry time is at or before `now`, earliest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<PendingCallback>> {
        let rows: Vec<CallbackRow> = sqlx::query_as(
            "SELECT * FROM pending_callback WHERE reentry_at <= ?1 ORDER BY reentry_at ASC",
        )
        .bind(format_ts(now))
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(CallbackRow::into_callback).collect()
    }

    /// List every pending callback, earliest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<PendingCallback>> {
        let rows: Vec<CallbackRow> =
            sqlx::query_as("SELECT * FROM pending_callback ORDER BY reentry_at ASC")
                .fetch_all(self.db.as_ref())
                .await?;

        rows.into_iter().map(CallbackRow::into_callback).collect()
    }

    /// Remove the pending callback for a lead. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn delete(&self, lead_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pending_callback WHERE lead_id = ?1")
            .bind(lead_id)
            .execute(self.db.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
