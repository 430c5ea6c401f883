//! Attempt ceiling classification.
//!
//! Advisory only. An exhausted lead remains actionable; the badge exists to
//! draw operator attention, never to block a disposition.

use crate::models::lead::Lead;
use crate::models::view::AttemptClassification;

/// Ceiling used when configuration does not provide one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Classify `count` attempts against a ceiling of `max`.
#[must_use]
pub fn classify(count: u32, max: u32) -> AttemptClassification {
    if count == 0 {
        AttemptClassification::None
    } else if count < max {
        AttemptClassification::Warning(count)
    } else {
        AttemptClassification::Exhausted(count)
    }
}

/// Tracks per-lead attempts against a configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptLimiter {
    max_attempts: u32,
}

impl Default for AttemptLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl AttemptLimiter {
    /// Create a limiter with the given ceiling.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Configured ceiling.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Badge for a lead.
    #[must_use]
    pub fn classify(&self, lead: &Lead) -> AttemptClassification {
        classify(lead.attempt_count, self.max_attempts)
    }

    /// Whether the lead has used up its attempts.
    #[must_use]
    pub fn is_exhausted(&self, lead: &Lead) -> bool {
        matches!(self.classify(lead), AttemptClassification::Exhausted(_))
    }
}
