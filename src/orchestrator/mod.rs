//! Queue orchestration.
//!
//! Covers lead admission, disposition application with per-lead
//! exclusivity, and the service facade tying them to the live view.

pub mod disposition_manager;
pub mod intake;
pub mod service;
