//! Queue snapshot model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lead::Lead;

/// Leads currently awaiting contact, in store order.
///
/// Produced by the store on every refresh cycle. The order is the store's
/// (arrival ascending unless the store says otherwise) and consumers must
/// not reorder it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct QueueSnapshot {
    /// Queued leads.
    pub leads: Vec<Lead>,
    /// When the store produced the snapshot.
    pub taken_at: DateTime<Utc>,
}

impl QueueSnapshot {
    /// Construct a snapshot.
    #[must_use]
    pub fn new(leads: Vec<Lead>, taken_at: DateTime<Utc>) -> Self {
        Self { leads, taken_at }
    }

    /// Lead identifiers in snapshot order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.leads.iter().map(|l| l.id.as_str())
    }

    /// Number of queued leads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leads.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }
}
