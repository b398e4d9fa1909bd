//! Finalization: merge every finished segment in paragraph order, apply the
//! clear-speech treatment, and save the result under a sanitized title.
//!
//! * [`Finalizer`]: the merge → treat → write pipeline.
//! * [`export_file_name`] / [`sanitize_title`]: title to filename.

pub mod filename;
pub mod pipeline;

pub use filename::{export_file_name, sanitize_title, AUDIO_EXTENSION};
pub use pipeline::{ExportOutcome, FinalizeError, Finalizer};
