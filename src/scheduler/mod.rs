//! Generation scheduling: a bounded pool over every eligible paragraph, and
//! single-paragraph attempts for manual (re)generation.

pub mod error;
pub mod runner;

pub use error::SchedulerError;
pub use runner::{GenerationScheduler, PoolSummary, StatusUpdate};
