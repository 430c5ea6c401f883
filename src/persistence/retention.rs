//! Retention service for time-based purge of closed leads.
//!
//! Runs as a background task deleting closed leads, and their outreach
//! rows, once they have been closed for longer than `retention_days`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::db::Database;
use super::lead_repo::LeadRepo;
use crate::{AppError, Result};

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawn the retention purge background task.
///
/// The task runs hourly until `cancel` fires.
#[must_use]
pub fn spawn_retention_task(
    db: Arc<Database>,
    retention_days: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let repo = LeadRepo::new(db);
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("retention task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(err) = purge(&repo, retention_days, Utc::now()).await {
                        error!(?err, "retention purge failed");
                    }
                }
            }
        }
    })
}

/// Purge leads closed more than `retention_days` before `now`.
///
/// # Errors
///
/// Returns `AppError::Config` if the cutoff date is out of range, or
/// `AppError::Db` if the delete fails.
pub async fn purge(repo: &LeadRepo, retention_days: u32, now: DateTime<Utc>) -> Result<u64> {
    let cutoff = now
        .checked_sub_days(Days::new(u64::from(retention_days)))
        .ok_or_else(|| {
            AppError::Config(format!(
                "retention of {retention_days} days reaches before the earliest date"
            ))
        })?;
    let purged = repo.purge_closed_before(cutoff).await?;
    info!(retention_days, purged, "retention purge completed");
    Ok(purged)
}
