#![forbid(unsafe_code)]

//! Lead engagement queue: disposition policy, attempt limits, callback
//! scheduling, and the live queue view.

pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod policy;
pub mod queue;
pub mod scheduler;

pub use config::GlobalConfig;
pub use errors::{AppError, DispositionError, Result};
