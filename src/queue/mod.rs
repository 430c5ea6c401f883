//! Live engagement queue.
//!
//! Covers snapshot reconciliation, the highlighted live view, and the
//! refresh cycle that keeps it in step with the store.

pub mod reconcile;
pub mod refresh;
pub mod synchronizer;
