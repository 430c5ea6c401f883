//! Disposition actions and the effects they produce.

use serde::{Deserialize, Serialize};

/// Operator's recorded outcome of a contact attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DispositionAction {
    /// Call went unanswered; the lead stays queued.
    NotAnswered,
    /// Appointment booked immediately.
    ScheduleNow,
    /// Defer the lead by one of the configured offsets.
    CallbackLater {
        /// Day count of the selected offset.
        offset_days: u32,
    },
    /// Lead declined.
    NotInterested,
    /// Phone number is invalid.
    InvalidNumber,
}

impl DispositionAction {
    /// Stable identifier used in logs and persistence.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAnswered => "not_answered",
            Self::ScheduleNow => "schedule_now",
            Self::CallbackLater { .. } => "callback_later",
            Self::NotInterested => "not_interested",
            Self::InvalidNumber => "invalid_number",
        }
    }
}

/// Why a lead left the queue for good.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// Appointment scheduled.
    Converted,
    /// Lead not interested.
    Declined,
    /// Phone number invalid.
    Unreachable,
}

/// Side effects a disposition requires, as decided by the policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub struct Effect {
    /// Lead leaves the live queue.
    pub remove_from_queue: bool,
    /// Attempt counter goes up by one.
    pub increment_attempt: bool,
    /// Lead re-enters the queue after this many calendar days.
    pub schedule_reentry_in_days: Option<u32>,
    /// Terminal classification, if the lead is closed.
    pub terminal_reason: Option<TerminalReason>,
    /// External collaborator should attempt email outreach instead.
    pub request_email_outreach: bool,
}
