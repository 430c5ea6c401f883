//! Pull-based refresh cycle for the live queue.
//!
//! A [`QueueRefresher`] periodically fetches the authoritative snapshot and
//! ingests it into the shared [`QueueSynchronizer`]. The same task owns the
//! highlight timer: it sleeps until the earliest highlight expiry and clears
//! lapsed highlights even when no refresh happens in between.
//!
//! Events are delivered via a `tokio::sync::mpsc` channel so observers (a
//! dashboard, the CLI) can repaint.
//!
//! [`QueueSynchronizer`]: super::synchronizer::QueueSynchronizer

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::persistence::store::LeadStore;
use crate::Result;

use super::reconcile::ReconciliationResult;
use super::synchronizer::SharedSynchronizer;

/// Events emitted by the refresh loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// A snapshot changed queue membership.
    Reconciled(ReconciliationResult),
    /// Highlight windows lapsed for these leads.
    HighlightsCleared(Vec<String>),
    /// The store could not be read; the view is unchanged.
    RefreshFailed(String),
}

/// Fetch one snapshot and ingest it.
///
/// # Errors
///
/// Returns `AppError::Db` if the snapshot cannot be fetched. The view is
/// left untouched in that case.
pub async fn refresh_once(
    store: &dyn LeadStore,
    synchronizer: &SharedSynchronizer,
) -> Result<ReconciliationResult> {
    let snapshot = store.fetch_queue_snapshot().await?;
    let mut sync = synchronizer.lock().await;
    Ok(sync.ingest(&snapshot, Instant::now()))
}

/// Builder for the background refresh task.
///
/// Call [`spawn`](Self::spawn) to start it.
pub struct QueueRefresher {
    store: Arc<dyn LeadStore>,
    synchronizer: SharedSynchronizer,
    interval: Duration,
    event_tx: mpsc::Sender<QueueEvent>,
    cancel: CancellationToken,
}

impl QueueRefresher {
    /// Construct a refresher (does not start it yet).
    #[must_use]
    pub fn new(
        store: Arc<dyn LeadStore>,
        synchronizer: SharedSynchronizer,
        interval: Duration,
        event_tx: mpsc::Sender<QueueEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            synchronizer,
            interval,
            event_tx,
            cancel,
        }
    }

    /// Spawn the background task and return a handle for controlling it.
    #[must_use]
    pub fn spawn(self) -> RefreshHandle {
        let trigger = Arc::new(Notify::new());
        let cancel_for_handle = self.cancel.clone();

        let task_handle = tokio::spawn(
            Self::run(
                self.store,
                self.synchronizer,
                self.interval,
                self.event_tx,
                self.cancel,
                Arc::clone(&trigger),
            )
            .instrument(info_span!("queue_refresh")),
        );

        RefreshHandle {
            trigger,
            join_handle: Some(task_handle),
            cancel: cancel_for_handle,
        }
    }

    async fn run(
        store: Arc<dyn LeadStore>,
        synchronizer: SharedSynchronizer,
        interval: Duration,
        event_tx: mpsc::Sender<QueueEvent>,
        cancel: CancellationToken,
        trigger: Arc<Notify>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let next_expiry = synchronizer.lock().await.next_highlight_expiry();

            let refresh = tokio::select! {
                () = cancel.cancelled() => {
                    debug!("queue refresher cancelled");
                    return;
                }
                _ = ticker.tick() => true,
                () = trigger.notified() => true,
                () = sleep_until_opt(next_expiry) => false,
            };

            let event = if refresh {
                match refresh_once(store.as_ref(), &synchronizer).await {
                    Ok(result) if result.is_empty() => None,
                    Ok(result) => {
                        info!(
                            arrived = result.arrived.len(),
                            departed = result.departed.len(),
                            "queue membership changed"
                        );
                        Some(QueueEvent::Reconciled(result))
                    }
                    Err(err) => {
                        warn!(%err, "queue refresh failed");
                        Some(QueueEvent::RefreshFailed(err.to_string()))
                    }
                }
            } else {
                let cleared = synchronizer
                    .lock()
                    .await
                    .expire_highlights(Instant::now());
                (!cleared.is_empty()).then_some(QueueEvent::HighlightsCleared(cleared))
            };

            if let Some(event) = event {
                let _ = event_tx.send(event).await;
            }
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Handle returned from [`QueueRefresher::spawn`].
pub struct RefreshHandle {
    trigger: Arc<Notify>,
    join_handle: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl Drop for RefreshHandle {
    /// Cancel the background task when the handle is dropped.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl RefreshHandle {
    /// Request an immediate refresh (external push).
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Shared trigger for other tasks, e.g. the readmission sweep.
    #[must_use]
    pub fn notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.trigger)
    }

    /// Stop the task and wait for it to exit.
    pub async fn await_completion(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.await;
        }
    }
}
