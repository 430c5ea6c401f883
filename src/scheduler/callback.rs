//! Callback scheduling.
//!
//! Turns a `callback_later` disposition into a [`PendingCallback`] and
//! answers whether a stored callback is due. Persisting the callback is the
//! store's job; because the store keys callbacks by lead, scheduling a lead
//! twice replaces the earlier re-entry instead of stacking a second one.

use chrono::{DateTime, Datelike, Days, Utc};
use tracing::debug;

use crate::errors::DispositionError;
use crate::models::callback::{CallbackOffset, PendingCallback};
use crate::policy::disposition::enabled_offset;

/// Computes re-entry times from the configured callback offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackScheduler {
    offsets: Vec<CallbackOffset>,
}

impl CallbackScheduler {
    /// Create a scheduler over the configured offsets, in configuration order.
    #[must_use]
    pub fn new(offsets: Vec<CallbackOffset>) -> Self {
        Self { offsets }
    }

    /// All configured offsets, enabled or not.
    #[must_use]
    pub fn offsets(&self) -> &[CallbackOffset] {
        &self.offsets
    }

    /// Offsets an operator may choose, in configuration order.
    pub fn enabled_offsets(&self) -> impl Iterator<Item = &CallbackOffset> {
        self.offsets.iter().filter(|o| o.enabled)
    }

    /// Whether `callback_later` is available at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled_offsets().next().is_some()
    }

    /// Build the pending callback for `lead_id`, deferred by `offset_days`.
    ///
    /// # Errors
    ///
    /// Returns `DispositionError::InvalidAction` if `offset_days` is not an
    /// enabled offset, or if the re-entry date is out of range.
    pub fn schedule(
        &self,
        lead_id: &str,
        offset_days: u32,
        now: DateTime<Utc>,
    ) -> Result<PendingCallback, DispositionError> {
        if enabled_offset(&self.offsets, offset_days).is_none() {
            return Err(DispositionError::InvalidAction(format!(
                "callback offset of {offset_days} days is not enabled"
            )));
        }

        let reentry_at = reentry_at(now, offset_days).ok_or_else(|| {
            DispositionError::InvalidAction(format!(
                "callback offset of {offset_days} days is out of range"
            ))
        })?;

        debug!(lead_id, offset_days, %reentry_at, "callback scheduled");
        Ok(PendingCallback {
            lead_id: lead_id.to_owned(),
            offset_days,
            reentry_at,
            scheduled_at: now,
        })
    }
}

/// Last year whose timestamps keep the fixed-width storage format.
const MAX_REENTRY_YEAR: i32 = 9999;

/// `now` plus `days` calendar days.
///
/// `None` on overflow, or when the result falls past year 9999 and so
/// cannot be stored in order.
#[must_use]
pub fn reentry_at(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    now.checked_add_days(Days::new(u64::from(days)))
        .filter(|at| at.year() <= MAX_REENTRY_YEAR)
}

/// Whether a callback re-entering at `reentry_at` is due at `now`.
#[must_use]
pub fn is_due(reentry_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= reentry_at
}
