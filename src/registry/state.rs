//! Per-paragraph generation state machine.
//!
//! ```text
//! Idle ───────────────┐
//! Error ──────────────┤
//! NeedsRegeneration ──┼──claim──▶ Generating ──ok───▶ Done
//! Done (manual) ──────┘                      └─fail─▶ Error
//!                                            └─precondition─▶ Idle
//! Done ──text edited──▶ NeedsRegeneration
//! ```
//!
//! Nothing leaves `Error` or `NeedsRegeneration` without an explicit
//! generation attempt.

/// Lifecycle of one paragraph's audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParagraphStatus {
    /// Freshly parsed, never generated.
    Idle,

    /// A generation call for this paragraph is in flight.
    Generating,

    /// The last attempt succeeded and an artifact is attached.
    Done,

    /// The last attempt failed; no artifact.
    Error,

    /// The text was edited after a successful generation.  The old artifact
    /// is still attached but stale.
    NeedsRegeneration,
}

impl ParagraphStatus {
    /// Whether the pool should pick this paragraph up.
    ///
    /// ```
    /// use narration_studio::registry::ParagraphStatus;
    ///
    /// assert!(ParagraphStatus::Idle.is_eligible());
    /// assert!(ParagraphStatus::Error.is_eligible());
    /// assert!(ParagraphStatus::NeedsRegeneration.is_eligible());
    /// assert!(!ParagraphStatus::Generating.is_eligible());
    /// assert!(!ParagraphStatus::Done.is_eligible());
    /// ```
    pub fn is_eligible(&self) -> bool {
        matches!(
            self,
            ParagraphStatus::Idle | ParagraphStatus::NeedsRegeneration | ParagraphStatus::Error
        )
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: ParagraphStatus) -> bool {
        use ParagraphStatus::*;
        match (self, next) {
            (Generating, Generating) => false,
            (_, Generating) => true,
            (Generating, Done | Error | Idle) => true,
            (Done, NeedsRegeneration) => true,
            _ => false,
        }
    }

    /// Badge text shown next to a paragraph.
    pub fn label(&self) -> &'static str {
        match self {
            ParagraphStatus::Idle => "Waiting",
            ParagraphStatus::Generating => "Generating...",
            ParagraphStatus::Done => "Ready",
            ParagraphStatus::Error => "Failed",
            ParagraphStatus::NeedsRegeneration => "Regenerate",
        }
    }

    /// Caption for the per-paragraph generate button.
    pub fn action_label(&self) -> &'static str {
        match self {
            ParagraphStatus::Done | ParagraphStatus::NeedsRegeneration => "Regenerate",
            _ => "Generate",
        }
    }
}

impl Default for ParagraphStatus {
    fn default() -> Self {
        ParagraphStatus::Idle
    }
}

impl std::fmt::Display for ParagraphStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
