//! Domain model module declarations.

pub mod callback;
pub mod disposition;
pub mod lead;
pub mod outreach;
pub mod queue;
pub mod view;
