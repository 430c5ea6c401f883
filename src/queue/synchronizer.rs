//! Live "awaiting contact" view.
//!
//! [`QueueSynchronizer`] mirrors the store's queue for display. Each refresh
//! hands it a fresh [`QueueSnapshot`]; it diffs membership against the
//! previous snapshot, replaces its contents in snapshot order, and marks new
//! arrivals as highlighted for a fixed window. Highlight expiry is a
//! timestamp checked on read, so it lapses even if no further snapshot ever
//! arrives, and a refresh that brings no new arrival for an entry never
//! re-arms it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::models::lead::Lead;
use crate::models::queue::QueueSnapshot;
use crate::models::view::LeadViewEntry;
use crate::policy::attempts::AttemptLimiter;

use super::reconcile::{reconcile, ReconciliationResult};

/// Synchronizer shared between the refresh loop and disposition handling.
pub type SharedSynchronizer = Arc<Mutex<QueueSynchronizer>>;

/// Display state of a live entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Just arrived; highlighted until `expires_at`.
    Arriving {
        /// End of the highlight window.
        expires_at: Instant,
    },
    /// Highlight cleared.
    Steady,
}

impl EntryState {
    fn resolved(self, now: Instant) -> Self {
        match self {
            Self::Arriving { expires_at } if now >= expires_at => Self::Steady,
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
struct LiveEntry {
    lead: Lead,
    state: EntryState,
}

/// Owner of the live queue view.
#[derive(Debug)]
pub struct QueueSynchronizer {
    entries: Vec<LiveEntry>,
    previous_ids: Vec<String>,
    /// Leads removed by a local disposition, with the removal time, hidden
    /// until the store stops reporting them or re-admits them later.
    suppressed: HashMap<String, DateTime<Utc>>,
    highlight_window: Duration,
    limiter: AttemptLimiter,
}

impl QueueSynchronizer {
    /// Create an empty view.
    #[must_use]
    pub fn new(highlight_window: Duration, limiter: AttemptLimiter) -> Self {
        Self {
            entries: Vec::new(),
            previous_ids: Vec::new(),
            suppressed: HashMap::new(),
            highlight_window,
            limiter,
        }
    }

    /// Wrap in the shared handle used by the refresher and dispositions.
    #[must_use]
    pub fn into_shared(self) -> SharedSynchronizer {
        Arc::new(Mutex::new(self))
    }

    /// Ingest a snapshot and return the membership delta.
    pub fn ingest(&mut self, snapshot: &QueueSnapshot, now: Instant) -> ReconciliationResult {
        let mut result = reconcile(
            self.previous_ids.iter().map(String::as_str),
            snapshot.ids(),
        );

        let mut previous: HashMap<String, EntryState> = self
            .entries
            .drain(..)
            .map(|e| (e.lead.id, e.state))
            .collect();

        let current: HashSet<&str> = snapshot.ids().collect();
        self.suppressed.retain(|id, _| current.contains(id.as_str()));

        let mut arriving: HashSet<&str> = {
            let fresh: HashSet<&str> = result.arrived.iter().map(String::as_str).collect();
            snapshot.ids().filter(|id| fresh.contains(id)).collect()
        };

        let mut entries = Vec::with_capacity(snapshot.len());
        for lead in &snapshot.leads {
            if let Some(removed_at) = self.suppressed.get(&lead.id).copied() {
                if lead.arrived_at <= removed_at {
                    arriving.remove(lead.id.as_str());
                    continue;
                }
                // Re-admitted since the local removal.
                self.suppressed.remove(&lead.id);
                if arriving.insert(lead.id.as_str()) {
                    result.arrived.push(lead.id.clone());
                }
            }

            let state = if arriving.contains(lead.id.as_str()) {
                EntryState::Arriving {
                    expires_at: now + self.highlight_window,
                }
            } else {
                previous.remove(&lead.id).unwrap_or(EntryState::Steady)
            };
            entries.push(LiveEntry {
                lead: lead.clone(),
                state,
            });
        }

        // Suppressed leads are not shown, so they are not arrivals either.
        result.arrived.retain(|id| arriving.contains(id.as_str()));

        self.entries = entries;
        self.previous_ids = snapshot.ids().map(str::to_owned).collect();

        if !result.is_empty() {
            debug!(
                arrived = result.arrived.len(),
                departed = result.departed.len(),
                "queue reconciled"
            );
        }
        result
    }

    /// Copy of the live view as of `now`.
    #[must_use]
    pub fn current_view(&self, now: Instant) -> Vec<LeadViewEntry> {
        self.entries
            .iter()
            .map(|e| LeadViewEntry {
                lead: e.lead.clone(),
                highlight: matches!(e.state.resolved(now), EntryState::Arriving { .. }),
                attempt_classification: self.limiter.classify(&e.lead),
            })
            .collect()
    }

    /// Move every entry whose window has lapsed to `Steady`, returning their ids.
    pub fn expire_highlights(&mut self, now: Instant) -> Vec<String> {
        let mut cleared = Vec::new();
        for entry in &mut self.entries {
            let resolved = entry.state.resolved(now);
            if resolved != entry.state {
                entry.state = resolved;
                cleared.push(entry.lead.id.clone());
            }
        }
        cleared
    }

    /// Earliest pending highlight expiry, if any entry is still arriving.
    #[must_use]
    pub fn next_highlight_expiry(&self) -> Option<Instant> {
        self.entries
            .iter()
            .filter_map(|e| match e.state {
                EntryState::Arriving { expires_at } => Some(expires_at),
                EntryState::Steady => None,
            })
            .min()
    }

    /// State of an entry as of `now`.
    #[must_use]
    pub fn entry_state(&self, lead_id: &str, now: Instant) -> Option<EntryState> {
        self.entries
            .iter()
            .find(|e| e.lead.id == lead_id)
            .map(|e| e.state.resolved(now))
    }

    /// Drop a lead after a disposition removed it from the queue.
    ///
    /// The lead stays hidden from later snapshots that still carry it with
    /// an arrival time at or before `removed_at`.
    pub fn remove(&mut self, lead_id: &str, removed_at: DateTime<Utc>) -> bool {
        self.suppressed.insert(lead_id.to_owned(), removed_at);
        let before = self.entries.len();
        self.entries.retain(|e| e.lead.id != lead_id);
        before != self.entries.len()
    }

    /// Replace the mirrored record of a lead that stays queued.
    ///
    /// Display state is untouched. Returns `false` if the lead is not live.
    pub fn update_lead(&mut self, lead: Lead) -> bool {
        match self.entries.iter_mut().find(|e| e.lead.id == lead.id) {
            Some(entry) => {
                entry.lead = lead;
                true
            }
            None => false,
        }
    }

    /// Whether the lead is in the live view.
    #[must_use]
    pub fn contains(&self, lead_id: &str) -> bool {
        self.entries.iter().any(|e| e.lead.id == lead_id)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
