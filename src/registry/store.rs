//! The paragraph table and its shared handle.
//!
//! [`ParagraphRegistry`] is the only mutable state shared between the
//! scheduler, the finalization pipeline and user edits.  It is mutated by
//! exactly three writers:
//!
//! * re-parse: [`replace_all`](ParagraphRegistry::replace_all) swaps the
//!   whole set;
//! * the scheduler: claim / complete / fail / revert;
//! * user edits: [`edit_text`](ParagraphRegistry::edit_text).
//!
//! [`SharedRegistry`] wraps it in `Arc<Mutex<…>>`.  Lock for short critical
//! sections only and never hold the guard across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use super::paragraph::{AudioArtifact, Paragraph, ParagraphId};
use super::state::ParagraphStatus;

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The id is not part of the current paragraph set (never existed, or
    /// was discarded by a re-parse).
    #[error("unknown paragraph {0}")]
    UnknownParagraph(ParagraphId),

    /// A generation call is already in flight for this paragraph.
    #[error("paragraph {0} is already generating")]
    AlreadyGenerating(ParagraphId),

    /// A completion arrived for a paragraph that is not generating.
    #[error("paragraph {0} is not generating")]
    NotGenerating(ParagraphId),
}

// ---------------------------------------------------------------------------
// ParagraphRegistry
// ---------------------------------------------------------------------------

/// Ordered paragraph table keyed by [`ParagraphId`].
#[derive(Debug, Default)]
pub struct ParagraphRegistry {
    paragraphs: Vec<Paragraph>,
    positions: HashMap<ParagraphId, usize>,
    next_id: u64,
}

impl ParagraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Whole-set operations
    // -----------------------------------------------------------------------

    /// Discard every paragraph (releasing their artifacts) and build a fresh
    /// `Idle` set from `texts`, in order.
    pub fn replace_all(&mut self, texts: Vec<String>) -> Vec<ParagraphId> {
        self.paragraphs.clear();
        self.positions.clear();

        let mut ids = Vec::with_capacity(texts.len());
        for (index, text) in texts.into_iter().enumerate() {
            let id = ParagraphId(self.next_id);
            self.next_id += 1;
            self.positions.insert(id, index);
            self.paragraphs.push(Paragraph::new(id, index, text));
            ids.push(id);
        }
        ids
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All paragraphs in index order.
    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn get(&self, id: ParagraphId) -> Option<&Paragraph> {
        self.positions.get(&id).map(|&pos| &self.paragraphs[pos])
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn status(&self, id: ParagraphId) -> Option<ParagraphStatus> {
        self.get(id).map(Paragraph::status)
    }

    /// Ids the pool should work on, in ascending index order.
    pub fn eligible_ids(&self) -> Vec<ParagraphId> {
        self.paragraphs
            .iter()
            .filter(|p| p.status.is_eligible())
            .map(|p| p.id)
            .collect()
    }

    pub fn generating_count(&self) -> usize {
        self.paragraphs
            .iter()
            .filter(|p| p.status == ParagraphStatus::Generating)
            .count()
    }

    /// `true` iff there is at least one paragraph and every one is `Done`.
    pub fn is_export_ready(&self) -> bool {
        !self.paragraphs.is_empty()
            && self
                .paragraphs
                .iter()
                .all(|p| p.status == ParagraphStatus::Done)
    }

    /// Artifacts of `Done` paragraphs in ascending index order.
    pub fn done_artifacts(&self) -> Vec<AudioArtifact> {
        self.paragraphs
            .iter()
            .filter(|p| p.status == ParagraphStatus::Done)
            .filter_map(|p| p.artifact.clone())
            .collect()
    }

    // -----------------------------------------------------------------------
    // User edits
    // -----------------------------------------------------------------------

    /// Replace a paragraph's text.  A `Done` paragraph whose text actually
    /// changes is demoted to `NeedsRegeneration`; every other status is left
    /// alone (an in-flight call keeps running with the text it was sent).
    pub fn edit_text(
        &mut self,
        id: ParagraphId,
        text: impl Into<String>,
    ) -> Result<ParagraphStatus, RegistryError> {
        let para = self.get_mut(id)?;
        let text = text.into();
        if para.text != text {
            para.text = text;
            if para.status.can_transition_to(ParagraphStatus::NeedsRegeneration) {
                para.status = ParagraphStatus::NeedsRegeneration;
            }
        }
        Ok(para.status)
    }

    // -----------------------------------------------------------------------
    // Scheduler transitions
    // -----------------------------------------------------------------------

    /// Claim a paragraph for generation: refuse if a call is already in
    /// flight, otherwise release the previous artifact, mark it `Generating`
    /// and return the text snapshot to send.
    pub fn begin_generation(&mut self, id: ParagraphId) -> Result<String, RegistryError> {
        let para = self.get_mut(id)?;
        if !para.status.can_transition_to(ParagraphStatus::Generating) {
            return Err(RegistryError::AlreadyGenerating(id));
        }
        para.release_artifact();
        para.status = ParagraphStatus::Generating;
        Ok(para.text.clone())
    }

    /// Successful attempt: attach the artifact and mark `Done`.
    pub fn complete_generation(
        &mut self,
        id: ParagraphId,
        artifact: AudioArtifact,
    ) -> Result<(), RegistryError> {
        let para = self.resolve_mut(id, ParagraphStatus::Done)?;
        para.attach_artifact(artifact);
        para.status = ParagraphStatus::Done;
        Ok(())
    }

    /// Failed attempt: no artifact, mark `Error`.
    pub fn fail_generation(&mut self, id: ParagraphId) -> Result<(), RegistryError> {
        let para = self.resolve_mut(id, ParagraphStatus::Error)?;
        para.release_artifact();
        para.status = ParagraphStatus::Error;
        Ok(())
    }

    /// Attempt aborted before any network call: back to `Idle`.
    pub fn revert_to_idle(&mut self, id: ParagraphId) -> Result<(), RegistryError> {
        let para = self.resolve_mut(id, ParagraphStatus::Idle)?;
        para.status = ParagraphStatus::Idle;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn get_mut(&mut self, id: ParagraphId) -> Result<&mut Paragraph, RegistryError> {
        let pos = *self
            .positions
            .get(&id)
            .ok_or(RegistryError::UnknownParagraph(id))?;
        Ok(&mut self.paragraphs[pos])
    }

    /// The paragraph, if its in-flight attempt may resolve to `next`.
    fn resolve_mut(
        &mut self,
        id: ParagraphId,
        next: ParagraphStatus,
    ) -> Result<&mut Paragraph, RegistryError> {
        let para = self.get_mut(id)?;
        if !para.status.can_transition_to(next) {
            return Err(RegistryError::NotGenerating(id));
        }
        Ok(para)
    }
}

// ---------------------------------------------------------------------------
// SharedRegistry
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`ParagraphRegistry`].  Cheap to clone.
pub type SharedRegistry = Arc<Mutex<ParagraphRegistry>>;

/// Construct an empty [`SharedRegistry`].
pub fn new_shared_registry() -> SharedRegistry {
    Arc::new(Mutex::new(ParagraphRegistry::new()))
}

/// Lock the registry.  Every critical section is a handful of field writes,
/// so a poisoned lock still holds consistent data and is recovered.
pub fn lock_registry(registry: &SharedRegistry) -> MutexGuard<'_, ParagraphRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
