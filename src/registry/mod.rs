//! Paragraph registry: the ordered paragraph set and its state machine.
//!
//! # Architecture
//!
//! ```text
//! text::prepare(raw) ──▶ ParagraphRegistry::replace_all   (whole set swapped)
//!                              │
//!          scheduler ──────────┼── begin / complete / fail / revert
//!          user edits ─────────┼── edit_text (Done → NeedsRegeneration)
//!          finalize  ──────────┴── done_artifacts (read only, index order)
//!
//! SharedRegistry (Arc<Mutex<ParagraphRegistry>>)
//! ```

pub mod paragraph;
pub mod state;
pub mod store;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use paragraph::{AudioArtifact, Paragraph, ParagraphId};
pub use state::ParagraphStatus;
pub use store::{lock_registry, new_shared_registry, ParagraphRegistry, RegistryError, SharedRegistry};
