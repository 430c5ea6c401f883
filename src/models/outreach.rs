//! Email outreach outbox model.
//!
//! Rows are written in the same transaction as an `invalid_number`
//! disposition. The external notifier drains them and marks each one
//! dispatched; the engine itself never sends email.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A request for the external notifier to reach a lead by email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct OutreachRequest {
    /// Auto-incrementing row id.
    pub id: i64,
    /// Lead the request concerns.
    pub lead_id: String,
    /// Email on file when the request was created.
    pub email: Option<String>,
    /// Creation timestamp.
    pub requested_at: DateTime<Utc>,
    /// Set once the notifier has picked the request up.
    pub dispatched_at: Option<DateTime<Utc>>,
}
