//! Merge → treat → export.
//!
//! The pipeline only reads the registry.  Nothing it does, successful or
//! not, changes a paragraph's status or artifact.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::activity::ActivityLog;
use crate::client::{ApiError, AudioTreater, SegmentMerger};
use crate::config::ExportConfig;
use crate::registry::{lock_registry, AudioArtifact, SharedRegistry};

use super::filename::export_file_name;

// ---------------------------------------------------------------------------
// FinalizeError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FinalizeError {
    /// The set is empty or some paragraph is not `Done`.
    #[error("All paragraphs must be Ready to download")]
    NotReady,

    /// Merge failed; no file was produced.
    #[error("Merge API failed: {0}")]
    Merge(#[source] ApiError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// ExportOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    /// `false` when treatment failed and the merged audio was saved as is.
    pub treated: bool,
    pub bytes: usize,
}

// ---------------------------------------------------------------------------
// Finalizer
// ---------------------------------------------------------------------------

pub struct Finalizer {
    registry: SharedRegistry,
    merger: Arc<dyn SegmentMerger>,
    treater: Arc<dyn AudioTreater>,
    activity: ActivityLog,
    config: ExportConfig,
}

impl Finalizer {
    pub fn new(
        registry: SharedRegistry,
        merger: Arc<dyn SegmentMerger>,
        treater: Arc<dyn AudioTreater>,
        activity: ActivityLog,
        config: ExportConfig,
    ) -> Self {
        Self {
            registry,
            merger,
            treater,
            activity,
            config,
        }
    }

    /// Export is possible iff the set is non-empty and every paragraph is
    /// `Done`.
    pub fn is_ready(&self) -> bool {
        lock_registry(&self.registry).is_export_ready()
    }

    /// Merge every `Done` artifact in paragraph order, treat the result
    /// (falling back to the untreated merge on failure) and write it to the
    /// export directory under a name derived from `title`.
    pub async fn export_all(&self, title: &str) -> Result<ExportOutcome, FinalizeError> {
        let segments = self.collect_segments()?;

        let merged = self.merge(&segments).await?;
        let (audio, treated) = self.treat(merged).await;

        let file_name = export_file_name(title, &self.config.fallback_title);
        let path = self.config.output_dir.join(file_name);
        self.write(&path, &audio).await?;

        self.activity.ok(format!("Saved {}.", path.display()));
        Ok(ExportOutcome {
            path,
            treated,
            bytes: audio.len(),
        })
    }

    fn collect_segments(&self) -> Result<Vec<AudioArtifact>, FinalizeError> {
        let registry = lock_registry(&self.registry);
        if !registry.is_export_ready() {
            return Err(FinalizeError::NotReady);
        }
        Ok(registry.done_artifacts())
    }

    async fn merge(&self, segments: &[AudioArtifact]) -> Result<AudioArtifact, FinalizeError> {
        self.activity.info("Merging segments...");
        match self.merger.merge(segments).await {
            Ok(merged) => {
                self.activity.ok("Merge complete.");
                Ok(merged)
            }
            Err(e) => {
                let err = FinalizeError::Merge(e);
                self.activity.error(format!("Download failed: {err}"));
                Err(err)
            }
        }
    }

    /// Never fails: a treatment error hands back the merged audio.
    async fn treat(&self, merged: AudioArtifact) -> (AudioArtifact, bool) {
        self.activity.info("Applying treatment...");
        match self.treater.treat(&merged, &self.config.treatment).await {
            Ok(treated) => {
                self.activity.ok("Treatment applied.");
                (treated, true)
            }
            Err(e) => {
                log::warn!("treatment {:?} failed: {e}", self.config.treatment);
                self.activity.warn("Treatment failed. Using raw audio.");
                (merged, false)
            }
        }
    }

    async fn write(&self, path: &std::path::Path, audio: &AudioArtifact) -> Result<(), FinalizeError> {
        let to_write_error = |source: std::io::Error| FinalizeError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(to_write_error)?;
        }
        tokio::fs::write(path, audio.as_bytes())
            .await
            .map_err(to_write_error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::registry::{new_shared_registry, ParagraphId, ParagraphStatus};

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Concatenates segment bytes and remembers what it was sent.
    #[derive(Default)]
    struct Concat {
        seen: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl SegmentMerger for Concat {
        async fn merge(&self, segments: &[AudioArtifact]) -> Result<AudioArtifact, ApiError> {
            let parts: Vec<Vec<u8>> = segments.iter().map(|s| s.as_bytes().to_vec()).collect();
            *self.seen.lock().unwrap() = parts.clone();
            Ok(AudioArtifact::new(parts.concat()))
        }
    }

    struct MergeFails;

    #[async_trait]
    impl SegmentMerger for MergeFails {
        async fn merge(&self, _segments: &[AudioArtifact]) -> Result<AudioArtifact, ApiError> {
            Err(ApiError::Status(500))
        }
    }

    /// Prefixes the audio with `T:`.
    struct Brighten;

    #[async_trait]
    impl AudioTreater for Brighten {
        async fn treat(&self, audio: &AudioArtifact, treatment: &str) -> Result<AudioArtifact, ApiError> {
            assert_eq!(treatment, "clear");
            let mut out = b"T:".to_vec();
            out.extend_from_slice(audio.as_bytes());
            Ok(AudioArtifact::new(out))
        }
    }

    struct TreatFails;

    #[async_trait]
    impl AudioTreater for TreatFails {
        async fn treat(&self, _audio: &AudioArtifact, _treatment: &str) -> Result<AudioArtifact, ApiError> {
            Err(ApiError::Timeout)
        }
    }

    /// Paragraphs "a", "b", "c" all `Done`, completed in reverse order.
    fn done_registry() -> (SharedRegistry, Vec<ParagraphId>) {
        let registry = new_shared_registry();
        let ids = {
            let mut reg = lock_registry(&registry);
            let ids = reg.replace_all(vec!["a.".into(), "b.".into(), "c.".into()]);
            for id in &ids {
                reg.begin_generation(*id).unwrap();
            }
            for (id, bytes) in ids.iter().zip([b"A", b"B", b"C"]).rev() {
                reg.complete_generation(*id, AudioArtifact::new(bytes.to_vec())).unwrap();
            }
            ids
        };
        (registry, ids)
    }

    fn export_config(dir: &std::path::Path) -> ExportConfig {
        ExportConfig {
            output_dir: dir.to_path_buf(),
            ..ExportConfig::default()
        }
    }

    #[tokio::test]
    async fn exports_treated_audio_in_paragraph_order() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = done_registry();
        let merger = Arc::new(Concat::default());
        let activity = ActivityLog::new();
        let finalizer = Finalizer::new(
            registry,
            merger.clone(),
            Arc::new(Brighten),
            activity.clone(),
            export_config(dir.path()),
        );

        let outcome = finalizer.export_all("My Psalm!! Reading").await.unwrap();

        assert_eq!(outcome.path, dir.path().join("My_Psalm_Reading.wav"));
        assert!(outcome.treated);
        assert_eq!(std::fs::read(&outcome.path).unwrap(), b"T:ABC");
        assert_eq!(
            *merger.seen.lock().unwrap(),
            vec![b"A".to_vec(), b"B".to_vec(), b"C".to_vec()]
        );
        assert!(activity.messages().contains(&"Treatment applied.".to_string()));
    }

    #[tokio::test]
    async fn treatment_failure_falls_back_to_merged_audio() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _) = done_registry();
        let activity = ActivityLog::new();
        let finalizer = Finalizer::new(
            registry,
            Arc::new(Concat::default()),
            Arc::new(TreatFails),
            activity.clone(),
            export_config(dir.path()),
        );

        let outcome = finalizer.export_all("").await.unwrap();

        assert!(!outcome.treated);
        assert_eq!(outcome.path, dir.path().join("Narration.wav"));
        assert_eq!(std::fs::read(&outcome.path).unwrap(), b"ABC");
        assert!(activity
            .entries()
            .iter()
            .any(|e| e.level == crate::activity::ActivityLevel::Warn));
    }

    #[tokio::test]
    async fn merge_failure_is_fatal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, ids) = done_registry();
        let finalizer = Finalizer::new(
            registry.clone(),
            Arc::new(MergeFails),
            Arc::new(Brighten),
            ActivityLog::new(),
            export_config(dir.path()),
        );

        let err = finalizer.export_all("Title").await.unwrap_err();

        assert!(matches!(err, FinalizeError::Merge(ApiError::Status(500))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        let reg = lock_registry(&registry);
        for id in ids {
            assert_eq!(reg.status(id), Some(ParagraphStatus::Done));
            assert!(reg.get(id).and_then(|p| p.artifact()).is_some());
        }
    }

    #[tokio::test]
    async fn not_ready_when_any_paragraph_is_not_done() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, ids) = done_registry();
        lock_registry(&registry).edit_text(ids[1], "changed.").unwrap();
        let merger = Arc::new(Concat::default());
        let finalizer = Finalizer::new(
            registry,
            merger.clone(),
            Arc::new(Brighten),
            ActivityLog::new(),
            export_config(dir.path()),
        );

        assert!(!finalizer.is_ready());
        assert!(matches!(
            finalizer.export_all("x").await,
            Err(FinalizeError::NotReady)
        ));
        assert!(merger.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn not_ready_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let finalizer = Finalizer::new(
            new_shared_registry(),
            Arc::new(Concat::default()),
            Arc::new(Brighten),
            ActivityLog::new(),
            export_config(dir.path()),
        );
        assert!(!finalizer.is_ready());
        assert!(matches!(
            finalizer.export_all("x").await,
            Err(FinalizeError::NotReady)
        ));
    }

    #[tokio::test]
    async fn missing_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("today");
        let (registry, _) = done_registry();
        let finalizer = Finalizer::new(
            registry,
            Arc::new(Concat::default()),
            Arc::new(Brighten),
            ActivityLog::new(),
            export_config(&nested),
        );

        let outcome = finalizer.export_all("Psalm 23").await.unwrap();
        assert_eq!(outcome.path, nested.join("Psalm_23.wav"));
        assert!(outcome.path.exists());
    }
}
