//! Command-driven orchestration of parse, generation and export.
//!
//! Front ends (the CLI here) talk to the studio only through
//! [`StudioCommand`]s and observe it through [`StudioEvent`]s; nothing in
//! the studio knows how results are displayed.

pub mod command;
pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use command::{StudioCommand, StudioEvent};
pub use runner::Studio;
