//! Disposition application.
//!
//! The single mutating entry point of the engine. A disposition is read,
//! decided, and committed as one exchange with the store; only one may be
//! in flight per lead, and a second concurrent request for the same lead is
//! rejected instead of queued. Dispositions for different leads run
//! independently.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{info, info_span, warn, Instrument};

use crate::errors::DispositionError;
use crate::models::callback::PendingCallback;
use crate::models::disposition::{DispositionAction, Effect};
use crate::models::lead::{Lead, LeadOutcome};
use crate::persistence::store::{DispositionCommit, LeadStore};
use crate::policy::disposition::DispositionPolicy;
use crate::queue::synchronizer::SharedSynchronizer;
use crate::scheduler::callback::CallbackScheduler;

/// Lead ids with a disposition currently in flight.
type InFlight = Arc<Mutex<HashSet<String>>>;

/// Releases the in-flight claim when dropped, including when the caller
/// abandons the request mid-way.
struct InFlightGuard {
    in_flight: InFlight,
    lead_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.lead_id);
    }
}

/// Applies operator dispositions against the store and the live view.
#[derive(Clone)]
pub struct DispositionManager {
    store: Arc<dyn LeadStore>,
    scheduler: CallbackScheduler,
    synchronizer: SharedSynchronizer,
    in_flight: InFlight,
}

impl DispositionManager {
    /// Create a manager.
    #[must_use]
    pub fn new(
        store: Arc<dyn LeadStore>,
        scheduler: CallbackScheduler,
        synchronizer: SharedSynchronizer,
    ) -> Self {
        Self {
            store,
            scheduler,
            synchronizer,
            in_flight: InFlight::default(),
        }
    }

    /// Callback scheduler used for `callback_later`.
    #[must_use]
    pub fn scheduler(&self) -> &CallbackScheduler {
        &self.scheduler
    }

    /// Whether a disposition for `lead_id` is currently in flight.
    #[must_use]
    pub fn is_in_flight(&self, lead_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(lead_id)
    }

    /// Apply `action` to `lead_id` now.
    ///
    /// # Errors
    ///
    /// See [`apply_disposition_at`](Self::apply_disposition_at).
    pub async fn apply_disposition(
        &self,
        lead_id: &str,
        action: DispositionAction,
    ) -> Result<Effect, DispositionError> {
        self.apply_disposition_at(lead_id, action, Utc::now()).await
    }

    /// Apply `action` to `lead_id` as of `now`.
    ///
    /// On success the effect has been committed to the store and reflected
    /// in the live view. On failure nothing changed: the lead stays where it
    /// was with its attempt count intact.
    ///
    /// # Errors
    ///
    /// Returns `DispositionError::ConcurrentModification` if another
    /// disposition for the lead is in flight or the lead changed underneath,
    /// `DispositionError::UnknownLead` if it is no longer awaiting contact,
    /// `DispositionError::InvalidAction` if the callback offset is not
    /// enabled, and `DispositionError::Store` on storage failure.
    pub async fn apply_disposition_at(
        &self,
        lead_id: &str,
        action: DispositionAction,
        now: DateTime<Utc>,
    ) -> Result<Effect, DispositionError> {
        let span = info_span!("apply_disposition", lead_id, action = action.as_str());

        async move {
            let _guard = self.claim(lead_id)?;

            let result = self.apply_claimed(lead_id, action, now).await;
            match &result {
                Ok(effect) => info!(
                    remove_from_queue = effect.remove_from_queue,
                    increment_attempt = effect.increment_attempt,
                    reentry_days = ?effect.schedule_reentry_in_days,
                    terminal_reason = ?effect.terminal_reason,
                    "disposition applied"
                ),
                Err(err) => warn!(%err, "disposition rejected"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn apply_claimed(
        &self,
        lead_id: &str,
        action: DispositionAction,
        now: DateTime<Utc>,
    ) -> Result<Effect, DispositionError> {
        let lead = self
            .store
            .get_lead(lead_id)
            .await?
            .filter(Lead::is_queued)
            .ok_or_else(|| {
                DispositionError::UnknownLead(format!("lead {lead_id} is not awaiting contact"))
            })?;

        let effect =
            DispositionPolicy::evaluate(lead.attempt_count, &action, self.scheduler.offsets())?;

        let callback = effect
            .schedule_reentry_in_days
            .map(|days| self.scheduler.schedule(lead_id, days, now))
            .transpose()?;

        let updated = self
            .store
            .commit_disposition(DispositionCommit {
                lead_id: lead_id.to_owned(),
                expected_attempts: lead.attempt_count,
                outcome: LeadOutcome::from_action(&action),
                effect,
                callback,
                now,
            })
            .await?;

        if effect.request_email_outreach {
            info!(lead_id, "email outreach requested");
        }

        let mut sync = self.synchronizer.lock().await;
        if effect.remove_from_queue {
            sync.remove(lead_id, now);
        } else {
            sync.update_lead(updated);
        }

        Ok(effect)
    }

    /// Move the pending callback of a suspended lead to a new offset.
    ///
    /// The lead keeps a single pending re-entry; the new one replaces it.
    /// Shares the per-lead in-flight claim with dispositions.
    ///
    /// # Errors
    ///
    /// Returns `DispositionError::InvalidAction` if the offset is not enabled,
    /// `DispositionError::UnknownLead` if the lead has no pending callback,
    /// `DispositionError::ConcurrentModification` if another request for the
    /// lead is in flight, and `DispositionError::Store` on storage failure.
    pub async fn reschedule_callback(
        &self,
        lead_id: &str,
        offset_days: u32,
        now: DateTime<Utc>,
    ) -> Result<PendingCallback, DispositionError> {
        let span = info_span!("reschedule_callback", lead_id, offset_days);

        async move {
            let _guard = self.claim(lead_id)?;
            let callback = self.scheduler.schedule(lead_id, offset_days, now)?;

            if !self.store.reschedule_callback(callback.clone()).await? {
                return Err(DispositionError::UnknownLead(format!(
                    "lead {lead_id} has no pending callback"
                )));
            }

            info!(reentry_at = %callback.reentry_at, "callback rescheduled");
            Ok(callback)
        }
        .instrument(span)
        .await
    }

    fn claim(&self, lead_id: &str) -> Result<InFlightGuard, DispositionError> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(lead_id.to_owned()) {
            return Err(DispositionError::ConcurrentModification(format!(
                "a disposition for lead {lead_id} is already in flight"
            )));
        }
        Ok(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            lead_id: lead_id.to_owned(),
        })
    }
}
