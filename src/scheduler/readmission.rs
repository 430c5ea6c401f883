//! Periodic re-admission of leads whose callback has come due.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::persistence::store::LeadStore;
use crate::Result;

use super::callback::is_due;

/// Return every lead whose callback is due at `now` to the queue.
///
/// Leads are re-admitted one at a time; a failure on one lead is logged and
/// does not stop the sweep. Returns the ids actually re-admitted, in due
/// order.
///
/// # Errors
///
/// Returns `AppError::Db` if the due callbacks cannot be listed.
pub async fn readmit_due(store: &dyn LeadStore, now: DateTime<Utc>) -> Result<Vec<String>> {
    let due = store.due_callbacks(now).await?;
    let mut readmitted = Vec::with_capacity(due.len());

    for callback in due {
        if !is_due(callback.reentry_at, now) {
            continue;
        }
        match store.readmit(&callback.lead_id, now).await {
            Ok(true) => {
                info!(
                    lead_id = %callback.lead_id,
                    offset_days = callback.offset_days,
                    "lead re-admitted after callback"
                );
                readmitted.push(callback.lead_id);
            }
            Ok(false) => {
                warn!(lead_id = %callback.lead_id, "callback due for lead that is not suspended");
            }
            Err(err) => {
                error!(lead_id = %callback.lead_id, %err, "failed to re-admit lead");
            }
        }
    }

    Ok(readmitted)
}

/// Spawn the readmission sweep.
///
/// Runs every `interval` until `cancel` fires. When a sweep re-admits at
/// least one lead and `refresh` is given, it is notified so the live queue
/// picks the leads up without waiting for its next scheduled refresh.
#[must_use]
pub fn spawn_readmission_task(
    store: Arc<dyn LeadStore>,
    interval: Duration,
    cancel: CancellationToken,
    refresh: Option<Arc<Notify>>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("readmission task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        match readmit_due(store.as_ref(), Utc::now()).await {
                            Ok(ids) if !ids.is_empty() => {
                                if let Some(ref notify) = refresh {
                                    notify.notify_one();
                                }
                            }
                            Ok(_) => {}
                            Err(err) => error!(%err, "readmission sweep failed"),
                        }
                    }
                }
            }
        }
        .instrument(info_span!("callback_readmission")),
    )
}
