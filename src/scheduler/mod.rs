//! Recurring job engine
//!
//! A small interval scheduler: jobs implement [`Job`], are registered with an
//! [`IntervalSpec`] and fire on the shared Tokio runtime until removed.

pub mod engine;
pub mod spec;

use std::fmt;

pub use engine::{Job, JobEngine, JobEntry, JobId, JobState};
pub use spec::IntervalSpec;

/// Errors raised while registering jobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The interval spec could not be parsed or is not positive
    InvalidSpec(String),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::InvalidSpec(spec) => write!(f, "invalid interval spec '{spec}'"),
        }
    }
}

impl std::error::Error for ScheduleError {}
