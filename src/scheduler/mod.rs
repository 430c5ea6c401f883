//! Callback scheduling.
//!
//! Computes re-entry times for deferred leads and re-admits them to the
//! queue once they come due.

pub mod callback;
pub mod readmission;
