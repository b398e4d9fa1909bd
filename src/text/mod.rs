//! Text normalization: raw pasted text to ordered, narration-ready paragraphs.
//!
//! This module provides:
//! * [`normalize`]: the pure rewrite pipeline (abbreviations, verse
//!   references, sentence termination, cleanup).
//! * [`split_paragraphs`] / [`prepare`]: cut normalized text into the
//!   paragraph list the registry is built from.
//! * [`abbreviations`]: the scripture expansion tables.
//!
//! # Quick start
//!
//! ```rust
//! use narration_studio::text::prepare;
//!
//! let paragraphs = prepare("Love your neighbor\nJohn 3:16 says this");
//! assert_eq!(paragraphs.len(), 2);
//! assert_eq!(paragraphs[1], "John 3. verse 16, says this.");
//! ```

pub mod abbreviations;
pub mod normalizer;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use normalizer::{normalize, prepare, split_paragraphs};
