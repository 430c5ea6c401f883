//! Caller-facing surface of the engagement queue.
//!
//! Bundles the store, the live view, and disposition handling built from
//! one [`GlobalConfig`]. Transports (the CLI, a dashboard backend) wrap
//! this type rather than the individual components.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::GlobalConfig;
use crate::errors::DispositionError;
use crate::models::disposition::{DispositionAction, Effect};
use crate::models::lead::{Lead, NewLead};
use crate::models::view::LeadViewEntry;
use crate::persistence::store::LeadStore;
use crate::policy::attempts::AttemptLimiter;
use crate::queue::reconcile::ReconciliationResult;
use crate::queue::refresh::{refresh_once, QueueEvent, QueueRefresher};
use crate::queue::synchronizer::{QueueSynchronizer, SharedSynchronizer};
use crate::scheduler::callback::CallbackScheduler;
use crate::Result;

use super::disposition_manager::DispositionManager;
use super::intake;

/// The lead engagement queue and its operations.
#[derive(Clone)]
pub struct LeadQueueService {
    store: Arc<dyn LeadStore>,
    synchronizer: SharedSynchronizer,
    dispositions: DispositionManager,
    config: Arc<GlobalConfig>,
}

impl LeadQueueService {
    /// Build the service over `store` using `config`.
    #[must_use]
    pub fn new(config: Arc<GlobalConfig>, store: Arc<dyn LeadStore>) -> Self {
        let limiter = AttemptLimiter::new(config.max_call_attempts);
        let synchronizer =
            QueueSynchronizer::new(config.queue.highlight_window(), limiter).into_shared();
        let scheduler = CallbackScheduler::new(config.callback_offsets.clone());
        let dispositions = DispositionManager::new(
            Arc::clone(&store),
            scheduler,
            Arc::clone(&synchronizer),
        );

        Self {
            store,
            synchronizer,
            dispositions,
            config,
        }
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn LeadStore> {
        &self.store
    }

    /// Shared live view.
    #[must_use]
    pub fn synchronizer(&self) -> &SharedSynchronizer {
        &self.synchronizer
    }

    /// Disposition handling.
    #[must_use]
    pub fn dispositions(&self) -> &DispositionManager {
        &self.dispositions
    }

    /// Configuration the service was built from.
    #[must_use]
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Apply an operator disposition.
    ///
    /// # Errors
    ///
    /// See [`DispositionManager::apply_disposition_at`].
    pub async fn apply_disposition(
        &self,
        lead_id: &str,
        action: DispositionAction,
    ) -> std::result::Result<Effect, DispositionError> {
        self.dispositions.apply_disposition(lead_id, action).await
    }

    /// Read-only copy of the live queue.
    pub async fn current_view(&self) -> Vec<LeadViewEntry> {
        self.synchronizer.lock().await.current_view(Instant::now())
    }

    /// Pull one snapshot from the store into the live view.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the snapshot cannot be fetched.
    pub async fn refresh(&self) -> Result<ReconciliationResult> {
        refresh_once(self.store.as_ref(), &self.synchronizer).await
    }

    /// Refresh loop builder using the configured interval.
    #[must_use]
    pub fn refresher(
        &self,
        event_tx: mpsc::Sender<QueueEvent>,
        cancel: CancellationToken,
    ) -> QueueRefresher {
        QueueRefresher::new(
            Arc::clone(&self.store),
            Arc::clone(&self.synchronizer),
            self.config.queue.refresh_interval(),
            event_tx,
            cancel,
        )
    }

    /// Admit a new lead. It shows up in the view on the next refresh.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store rejects the insert.
    pub async fn admit(&self, contact: NewLead) -> Result<Lead> {
        intake::admit_lead(self.store.as_ref(), contact).await
    }

    /// Synthesize a demo lead and refresh so it appears immediately.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert or refresh fails.
    #[cfg(feature = "test-leads")]
    pub async fn request_test_lead(&self) -> Result<Lead> {
        let lead = intake::request_test_lead(self.store.as_ref()).await?;
        self.refresh().await?;
        Ok(lead)
    }
}
