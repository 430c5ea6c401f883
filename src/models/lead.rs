//! Lead model for contacts awaiting first engagement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::disposition::{DispositionAction, TerminalReason};

/// Result recorded by the most recent disposition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeadOutcome {
    /// Nobody picked up.
    NotAnswered,
    /// Appointment booked.
    Converted,
    /// Lead said no.
    Declined,
    /// Number was invalid.
    Unreachable,
    /// Deferred to a later callback.
    CallbackScheduled,
}

impl LeadOutcome {
    /// Outcome recorded for a successfully applied action.
    #[must_use]
    pub fn from_action(action: &DispositionAction) -> Self {
        match action {
            DispositionAction::NotAnswered => Self::NotAnswered,
            DispositionAction::ScheduleNow => Self::Converted,
            DispositionAction::NotInterested => Self::Declined,
            DispositionAction::InvalidNumber => Self::Unreachable,
            DispositionAction::CallbackLater { .. } => Self::CallbackScheduled,
        }
    }
}

/// Persisted lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// Awaiting contact; part of the live queue.
    Queued,
    /// Waiting on a pending callback.
    Suspended,
    /// Terminally dispositioned.
    Closed,
}

/// Contact fields supplied by the ingestion step. Any of them may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct NewLead {
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Company name.
    pub company: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Origin tag, e.g. the originating ad platform.
    pub source: Option<String>,
    /// Display label of the origin, e.g. the ad form name.
    pub origin_label: Option<String>,
}

/// A contact awaiting first engagement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Lead {
    /// Unique record identifier.
    pub id: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Company name.
    pub company: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Number of unanswered contact attempts.
    pub attempt_count: u32,
    /// Outcome of the latest disposition.
    pub last_outcome: Option<LeadOutcome>,
    /// Current lifecycle status.
    pub status: LeadStatus,
    /// Why the lead was closed, if it was.
    pub terminal_reason: Option<TerminalReason>,
    /// Origin tag.
    pub source: Option<String>,
    /// Origin display label.
    pub origin_label: Option<String>,
    /// Arrival (or re-admission) timestamp.
    pub arrived_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Timestamp of terminal disposition.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Lead {
    /// Construct a freshly arrived, queued lead.
    #[must_use]
    pub fn new(contact: NewLead, arrived_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            first_name: contact.first_name,
            last_name: contact.last_name,
            email: contact.email,
            phone: contact.phone,
            company: contact.company,
            address: contact.address,
            attempt_count: 0,
            last_outcome: None,
            status: LeadStatus::Queued,
            terminal_reason: None,
            source: contact.source,
            origin_label: contact.origin_label,
            arrived_at,
            updated_at: arrived_at,
            closed_at: None,
        }
    }

    /// Best-effort human-readable name for operator displays.
    #[must_use]
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.trim().is_empty())
            .collect();

        if !parts.is_empty() {
            return parts.join(" ");
        }
        self.company
            .clone()
            .or_else(|| self.email.clone())
            .or_else(|| self.phone.clone())
            .unwrap_or_else(|| "Unknown".into())
    }

    /// Whether the lead is currently part of the live queue.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.status == LeadStatus::Queued
    }
}
