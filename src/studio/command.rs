//! Messages into and out of the [`Studio`](super::Studio).

use std::path::PathBuf;

use crate::config::VoiceConfig;
use crate::registry::{ParagraphId, ParagraphStatus};
use crate::scheduler::PoolSummary;

/// Everything a front end can ask the studio to do.
#[derive(Debug, Clone)]
pub enum StudioCommand {
    /// Normalize and split `text`, replace the paragraph set, start the pool.
    Parse(String),
    /// Replace one paragraph's text.
    Edit { id: ParagraphId, text: String },
    /// Generate (or regenerate) one paragraph.
    Generate(ParagraphId),
    /// Run the pool over every eligible paragraph.
    GenerateAll,
    /// Merge, treat and save everything.
    ExportAll { title: String },
    /// Use these voice parameters for attempts started from now on.
    SetVoice(VoiceConfig),
}

/// What the studio reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioEvent {
    Parsed { count: usize },
    ParagraphChanged { id: ParagraphId, status: ParagraphStatus },
    PoolStarted,
    PoolFinished(PoolSummary),
    /// Export availability flipped.
    ExportReady(bool),
    Exported { path: PathBuf, treated: bool },
    /// Something the user must be told right away.
    Notice(String),
}
