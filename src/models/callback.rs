//! Callback offset configuration and pending re-entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest offset configuration accepts: one hundred years.
pub const MAX_OFFSET_DAYS: u32 = 36_500;

/// A named deferral duration an operator may pick for "callback later".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CallbackOffset {
    /// Operator-facing label, e.g. `1 Week`.
    pub label: String,
    /// Calendar days until the lead re-enters the queue.
    pub days: u32,
    /// Only enabled offsets are legal choices.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl CallbackOffset {
    /// Construct an enabled offset.
    #[must_use]
    pub fn new(label: impl Into<String>, days: u32) -> Self {
        Self {
            label: label.into(),
            days,
            enabled: true,
        }
    }

    /// Offsets used when configuration provides none.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("1 Week", 7),
            Self::new("1 Month", 30),
            Self::new("3 Months", 90),
            Self::new("6 Months", 180),
        ]
    }
}

/// A lead suspended from the queue until `reentry_at`.
///
/// A lead has at most one pending callback; scheduling again replaces it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PendingCallback {
    /// Suspended lead.
    pub lead_id: String,
    /// Offset the operator selected.
    pub offset_days: u32,
    /// When the lead becomes due for re-admission.
    pub reentry_at: DateTime<Utc>,
    /// When the callback was scheduled.
    pub scheduled_at: DateTime<Utc>,
}
