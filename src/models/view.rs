//! Read-only view entries handed to queue observers.

use serde::{Deserialize, Serialize};

use super::lead::Lead;

/// Operator-attention badge derived from a lead's attempt count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "level", content = "attempts", rename_all = "snake_case")]
pub enum AttemptClassification {
    /// No attempts yet.
    None,
    /// Some attempts, still under the ceiling.
    Warning(u32),
    /// Ceiling reached or exceeded.
    Exhausted(u32),
}

/// A lead as shown in the live queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LeadViewEntry {
    /// Mirrored lead record.
    #[serde(flatten)]
    pub lead: Lead,
    /// Newly arrived and still inside the highlight window.
    pub highlight: bool,
    /// Attempt badge.
    pub attempt_classification: AttemptClassification,
}
