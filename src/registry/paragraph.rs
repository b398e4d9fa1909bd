//! Paragraph entity and its audio artifact.

use std::fmt;
use std::sync::Arc;

use super::state::ParagraphStatus;

// ---------------------------------------------------------------------------
// ParagraphId
// ---------------------------------------------------------------------------

/// Stable paragraph identifier.  Issued by the registry from a counter that
/// is never reset, so ids are not reused within a session even across
/// re-parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParagraphId(pub u64);

impl fmt::Display for ParagraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "para-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AudioArtifact
// ---------------------------------------------------------------------------

/// Encoded audio returned by a generation, merge or treatment call.
///
/// The bytes sit behind an `Arc` so the finalization pipeline can read a
/// snapshot without copying; the paragraph's own handle is still dropped the
/// moment it is replaced or cleared.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    bytes: Arc<[u8]>,
}

impl AudioArtifact {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for AudioArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioArtifact")
            .field("len", &self.bytes.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Paragraph
// ---------------------------------------------------------------------------

/// One unit of narration.  Fields are read-only from outside the registry;
/// every mutation goes through [`ParagraphRegistry`](super::ParagraphRegistry)
/// so the state machine cannot be bypassed.
#[derive(Debug, Clone)]
pub struct Paragraph {
    pub(super) id: ParagraphId,
    pub(super) index: usize,
    pub(super) text: String,
    pub(super) status: ParagraphStatus,
    pub(super) artifact: Option<AudioArtifact>,
}

impl Paragraph {
    pub(super) fn new(id: ParagraphId, index: usize, text: String) -> Self {
        Self {
            id,
            index,
            text,
            status: ParagraphStatus::Idle,
            artifact: None,
        }
    }

    pub fn id(&self) -> ParagraphId {
        self.id
    }

    /// Position in the parsed sequence; fixes merge order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> ParagraphStatus {
        self.status
    }

    pub fn artifact(&self) -> Option<&AudioArtifact> {
        self.artifact.as_ref()
    }

    /// Drop the current artifact, if any.
    pub(super) fn release_artifact(&mut self) {
        self.artifact = None;
    }

    /// Attach a new artifact; the previous one is dropped first.
    pub(super) fn attach_artifact(&mut self, artifact: AudioArtifact) {
        self.release_artifact();
        self.artifact = Some(artifact);
    }
}
