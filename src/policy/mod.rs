//! Disposition rules.
//!
//! Provides the pure disposition decision table and the advisory
//! attempt-ceiling classification.

pub mod attempts;
pub mod disposition;
