//! Membership diff between successive queue snapshots.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Arrivals and departures between two snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ReconciliationResult {
    /// Ids present now but absent before, in current snapshot order.
    pub arrived: Vec<String>,
    /// Ids present before but absent now, in previous snapshot order.
    pub departed: Vec<String>,
}

impl ReconciliationResult {
    /// Whether membership is unchanged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrived.is_empty() && self.departed.is_empty()
    }
}

/// Diff two ordered id sequences.
///
/// `arrived = current − previous`, `departed = previous − current`.
/// Duplicate ids within one sequence are reported once.
#[must_use]
pub fn reconcile<'a, P, C>(previous: P, current: C) -> ReconciliationResult
where
    P: IntoIterator<Item = &'a str>,
    C: IntoIterator<Item = &'a str>,
{
    let previous: Vec<&str> = previous.into_iter().collect();
    let current: Vec<&str> = current.into_iter().collect();
    let previous_set: HashSet<&str> = previous.iter().copied().collect();
    let current_set: HashSet<&str> = current.iter().copied().collect();

    ReconciliationResult {
        arrived: ordered_difference(&current, &previous_set),
        departed: ordered_difference(&previous, &current_set),
    }
}

fn ordered_difference(ids: &[&str], exclude: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| !exclude.contains(*id) && seen.insert(**id))
        .map(|id| (*id).to_owned())
        .collect()
}
