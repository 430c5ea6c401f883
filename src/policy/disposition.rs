//! Disposition decision table.
//!
//! Maps a lead's current attempt count and the operator's chosen
//! [`DispositionAction`] to the [`Effect`] the store must apply. Pure: no
//! I/O, no clock, no shared state. The attempt ceiling is deliberately not
//! an input; reaching it changes only the display badge.

use tracing::{debug, info_span};

use crate::errors::DispositionError;
use crate::models::callback::CallbackOffset;
use crate::models::disposition::{DispositionAction, Effect, TerminalReason};

/// Evaluates disposition actions against the enabled callback offsets.
pub struct DispositionPolicy;

impl DispositionPolicy {
    /// Decide the effect of `action` on a lead with `attempt_count` attempts.
    ///
    /// # Errors
    ///
    /// Returns `DispositionError::InvalidAction` if `action` is
    /// `callback_later` with an offset that is not among the enabled
    /// offsets, which is every offset when none are enabled.
    pub fn evaluate(
        attempt_count: u32,
        action: &DispositionAction,
        offsets: &[CallbackOffset],
    ) -> Result<Effect, DispositionError> {
        let _span = info_span!(
            "disposition_policy",
            attempt_count,
            action = action.as_str(),
        )
        .entered();

        let effect = match *action {
            DispositionAction::NotAnswered => Effect {
                increment_attempt: true,
                ..Effect::default()
            },
            DispositionAction::ScheduleNow => terminal(TerminalReason::Converted),
            DispositionAction::NotInterested => terminal(TerminalReason::Declined),
            DispositionAction::InvalidNumber => Effect {
                request_email_outreach: true,
                ..terminal(TerminalReason::Unreachable)
            },
            DispositionAction::CallbackLater { offset_days } => {
                let offset = enabled_offset(offsets, offset_days).ok_or_else(|| {
                    DispositionError::InvalidAction(format!(
                        "callback offset of {offset_days} days is not enabled"
                    ))
                })?;
                debug!(label = %offset.label, offset_days, "callback offset resolved");
                Effect {
                    remove_from_queue: true,
                    schedule_reentry_in_days: Some(offset.days),
                    ..Effect::default()
                }
            }
        };

        Ok(effect)
    }
}

/// First enabled offset with the given day count.
#[must_use]
pub fn enabled_offset(offsets: &[CallbackOffset], days: u32) -> Option<&CallbackOffset> {
    offsets.iter().find(|o| o.enabled && o.days == days)
}

fn terminal(reason: TerminalReason) -> Effect {
    Effect {
        remove_from_queue: true,
        terminal_reason: Some(reason),
        ..Effect::default()
    }
}
