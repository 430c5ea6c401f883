//! Lead repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::DispositionError;
use crate::models::disposition::TerminalReason;
use crate::models::lead::{Lead, LeadOutcome, LeadStatus};
use crate::{AppError, Result};

use super::db::Database;
use super::store::DispositionCommit;
use super::{callback_repo, format_ts, outreach_repo, parse_opt_ts, parse_ts};

/// Repository wrapper around `SQLite` for lead records.
#[derive(Clone)]
pub struct LeadRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct LeadRow {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    company: Option<String>,
    address: Option<String>,
    attempt_count: i64,
    last_outcome: Option<String>,
    status: String,
    terminal_reason: Option<String>,
    source: Option<String>,
    origin_label: Option<String>,
    arrived_at: String,
    updated_at: String,
    closed_at: Option<String>,
}

impl LeadRow {
    /// Convert a database row into the domain model.
    fn into_lead(self) -> Result<Lead> {
        let attempt_count = u32::try_from(self.attempt_count)
            .map_err(|e| AppError::Db(format!("invalid attempt_count: {e}")))?;
        let last_outcome = self.last_outcome.as_deref().map(parse_outcome).transpose()?;
        let terminal_reason = self
            .terminal_reason
            .as_deref()
            .map(parse_terminal_reason)
            .transpose()?;

        Ok(Lead {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            address: self.address,
            attempt_count,
            last_outcome,
            status: parse_status(&self.status)?,
            terminal_reason,
            source: self.source,
            origin_label: self.origin_label,
            arrived_at: parse_ts(&self.arrived_at, "arrived_at")?,
            updated_at: parse_ts(&self.updated_at, "updated_at")?,
            closed_at: parse_opt_ts(self.closed_at.as_deref(), "closed_at")?,
        })
    }
}

fn parse_status(s: &str) -> Result<LeadStatus> {
    match s {
        "queued" => Ok(LeadStatus::Queued),
        "suspended" => Ok(LeadStatus::Suspended),
        "closed" => Ok(LeadStatus::Closed),
        other => Err(AppError::Db(format!("invalid lead status: {other}"))),
    }
}

fn status_str(s: LeadStatus) -> &'static str {
    match s {
        LeadStatus::Queued => "queued",
        LeadStatus::Suspended => "suspended",
        LeadStatus::Closed => "closed",
    }
}

fn parse_outcome(s: &str) -> Result<LeadOutcome> {
    match s {
        "not_answered" => Ok(LeadOutcome::NotAnswered),
        "converted" => Ok(LeadOutcome::Converted),
        "declined" => Ok(LeadOutcome::Declined),
        "unreachable" => Ok(LeadOutcome::Unreachable),
        "callback_scheduled" => Ok(LeadOutcome::CallbackScheduled),
        other => Err(AppError::Db(format!("invalid last_outcome: {other}"))),
    }
}

fn outcome_str(o: LeadOutcome) -> &'static str {
    match o {
        LeadOutcome::NotAnswered => "not_answered",
        LeadOutcome::Converted => "converted",
        LeadOutcome::Declined => "declined",
        LeadOutcome::Unreachable => "unreachable",
        LeadOutcome::CallbackScheduled => "callback_scheduled",
    }
}

fn parse_terminal_reason(s: &str) -> Result<TerminalReason> {
    match s {
        "converted" => Ok(TerminalReason::Converted),
        "declined" => Ok(TerminalReason::Declined),
        "unreachable" => Ok(TerminalReason::Unreachable),
        other => Err(AppError::Db(format!("invalid terminal_reason: {other}"))),
    }
}

fn terminal_reason_str(r: TerminalReason) -> &'static str {
    match r {
        TerminalReason::Converted => "converted",
        TerminalReason::Declined => "declined",
        TerminalReason::Unreachable => "unreachable",
    }
}

impl LeadRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new lead record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, lead: &Lead) -> Result<Lead> {
        sqlx::query(
            "INSERT INTO lead (id, first_name, last_name, email, phone, company, address,
             attempt_count, last_outcome, status, terminal_reason, source, origin_label,
             arrived_at, updated_at, closed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&lead.id)
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.company)
        .bind(&lead.address)
        .bind(i64::from(lead.attempt_count))
        .bind(lead.last_outcome.map(outcome_str))
        .bind(status_str(lead.status))
        .bind(lead.terminal_reason.map(terminal_reason_str))
        .bind(&lead.source)
        .bind(&lead.origin_label)
        .bind(format_ts(lead.arrived_at))
        .bind(format_ts(lead.updated_at))
        .bind(lead.closed_at.map(format_ts))
        .execute(self.db.as_ref())
        .await?;

        Ok(lead.clone())
    }

    /// Retrieve a lead by identifier.
    ///
    /// Returns `Ok(None)` if the lead does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Lead>> {
        let row: Option<LeadRow> = sqlx::query_as("SELECT * FROM lead WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;

        row.map(LeadRow::into_lead).transpose()
    }

    /// List queued leads in arrival order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_queued(&self) -> Result<Vec<Lead>> {
        let rows: Vec<LeadRow> = sqlx::query_as(
            "SELECT * FROM lead WHERE status = 'queued' ORDER BY arrived_at ASC, id ASC",
        )
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(LeadRow::into_lead).collect()
    }

    /// Apply a disposition in a single transaction.
    ///
    /// Updates the lead, upserts the pending callback when the effect defers
    /// re-entry, and appends an outreach row when the effect requests one.
    /// Nothing is written unless every step succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the lead does not exist or is no longer
    /// queued. Returns `DispositionError::ConcurrentModification` (wrapped in
    /// `AppError::Disposition`) if the attempt count changed since it was read.
    /// Returns `AppError::Db` if any statement fails.
    pub async fn commit_disposition(&self, commit: &DispositionCommit) -> Result<Lead> {
        let mut tx = self.db.begin().await?;

        let row: Option<LeadRow> = sqlx::query_as("SELECT * FROM lead WHERE id = ?1")
            .bind(&commit.lead_id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut lead = row
            .map(LeadRow::into_lead)
            .transpose()?
            .filter(Lead::is_queued)
            .ok_or_else(|| {
                AppError::NotFound(format!("lead {} is not awaiting contact", commit.lead_id))
            })?;

        let effect = commit.effect;
        if effect.increment_attempt {
            lead.attempt_count = lead.attempt_count.checked_add(1).ok_or_else(|| {
                AppError::Db(format!("attempt_count overflow for lead {}", lead.id))
            })?;
        }
        lead.last_outcome = Some(commit.outcome);
        lead.updated_at = commit.now;
        if let Some(reason) = effect.terminal_reason {
            lead.status = LeadStatus::Closed;
            lead.terminal_reason = Some(reason);
            lead.closed_at = Some(commit.now);
        } else if commit.callback.is_some() {
            lead.status = LeadStatus::Suspended;
        }

        let updated = sqlx::query(
            "UPDATE lead SET attempt_count = ?1, last_outcome = ?2, status = ?3,
             terminal_reason = ?4, updated_at = ?5, closed_at = ?6
             WHERE id = ?7 AND status = 'queued' AND attempt_count = ?8",
        )
        .bind(i64::from(lead.attempt_count))
        .bind(lead.last_outcome.map(outcome_str))
        .bind(status_str(lead.status))
        .bind(lead.terminal_reason.map(terminal_reason_str))
        .bind(format_ts(lead.updated_at))
        .bind(lead.closed_at.map(format_ts))
        .bind(&commit.lead_id)
        .bind(i64::from(commit.expected_attempts))
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Disposition(
                DispositionError::ConcurrentModification(format!(
                    "lead {} changed while the disposition was being applied",
                    commit.lead_id
                )),
            ));
        }

        if let Some(ref callback) = commit.callback {
            callback_repo::upsert_on(&mut tx, callback).await?;
        }

        if effect.request_email_outreach {
            outreach_repo::insert_on(&mut tx, &lead.id, lead.email.as_deref(), commit.now).await?;
        }

        tx.commit().await?;
        Ok(lead)
    }

    /// Return a suspended lead to the queue and clear its pending callback.
    ///
    /// The attempt count is left untouched; `arrived_at` becomes `now`.
    /// Returns `false` if the lead was not suspended.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn readmit(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut tx = self.db.begin().await?;
        let ts = format_ts(now);

        let updated = sqlx::query(
            "UPDATE lead SET status = 'queued', arrived_at = ?1, updated_at = ?1
             WHERE id = ?2 AND status = 'suspended'",
        )
        .bind(&ts)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM pending_callback WHERE lead_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated.rows_affected() > 0)
    }

    /// Delete closed leads whose `closed_at` precedes `cutoff`.
    ///
    /// Returns the number of leads removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn purge_closed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let cutoff = format_ts(cutoff);
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "DELETE FROM outreach_request WHERE lead_id IN
             (SELECT id FROM lead WHERE status = 'closed' AND closed_at < ?1)",
        )
        .bind(&cutoff)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM lead WHERE status = 'closed' AND closed_at < ?1")
            .bind(&cutoff)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
