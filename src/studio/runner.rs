//! The studio orchestrator.
//!
//! ```text
//! StudioCommand ──▶ Studio::run
//!   Parse(text)     replace_all → Parsed → pool driver
//!   Edit{id,text}   edit_text   → ParagraphChanged / ExportReady
//!   Generate(id)    spawn scheduler.generate_one
//!   GenerateAll     pool driver
//!   ExportAll{..}   spawn finalizer.export_all → Exported / Notice
//!
//! scheduler status updates ──▶ forwarder ──▶ ParagraphChanged / ExportReady
//! ```
//!
//! Generation and export run as spawned tasks so edits keep flowing while
//! calls are in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::activity::ActivityLog;
use crate::client::{AudioTreater, HttpStudioClient, SegmentMerger, SpeechGenerator};
use crate::config::{AppConfig, VoiceConfig};
use crate::finalize::Finalizer;
use crate::registry::{
    lock_registry, new_shared_registry, ParagraphId, ParagraphRegistry, ParagraphStatus,
    SharedRegistry,
};
use crate::scheduler::{GenerationScheduler, SchedulerError, StatusUpdate};
use crate::text;

use super::command::{StudioCommand, StudioEvent};

// ---------------------------------------------------------------------------
// Studio
// ---------------------------------------------------------------------------

/// Owns the paragraph registry and routes commands to the scheduler and the
/// finalization pipeline.
///
/// ```rust,no_run
/// use narration_studio::activity::ActivityLog;
/// use narration_studio::config::AppConfig;
/// use narration_studio::studio::{Studio, StudioCommand};
///
/// # async fn example() {
/// let (studio, mut events) = Studio::from_config(&AppConfig::default(), ActivityLog::new());
/// let (tx, rx) = tokio::sync::mpsc::channel(16);
/// let handle = tokio::spawn(studio.run(rx));
///
/// tx.send(StudioCommand::Parse("Psalm 23:1 The Lord is my shepherd".into())).await.unwrap();
/// if let Some(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// # drop(tx);
/// # handle.await.unwrap();
/// # }
/// ```
pub struct Studio {
    registry: SharedRegistry,
    scheduler: GenerationScheduler,
    finalizer: Arc<Finalizer>,
    activity: ActivityLog,
    voice: VoiceConfig,
    events: mpsc::UnboundedSender<StudioEvent>,
    export_ready: ExportReadiness,
    pool_pending: Arc<AtomicBool>,
}

impl Studio {
    /// Wire a studio to explicit backends.  Returns the studio and the
    /// receiving end of its event stream.  Must be called from within a
    /// tokio runtime.
    pub fn new(
        config: &AppConfig,
        generator: Arc<dyn SpeechGenerator>,
        merger: Arc<dyn SegmentMerger>,
        treater: Arc<dyn AudioTreater>,
        activity: ActivityLog,
    ) -> (Self, mpsc::UnboundedReceiver<StudioEvent>) {
        let registry = new_shared_registry();
        let (events, events_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let scheduler = GenerationScheduler::new(
            registry.clone(),
            generator,
            activity.clone(),
            config.pool.concurrency,
        )
        .with_status_updates(updates_tx);

        let finalizer = Arc::new(Finalizer::new(
            registry.clone(),
            merger,
            treater,
            activity.clone(),
            config.export.clone(),
        ));

        let export_ready = ExportReadiness::default();
        tokio::spawn(forward_status_updates(
            registry.clone(),
            updates_rx,
            events.clone(),
            export_ready.clone(),
        ));

        let studio = Self {
            registry,
            scheduler,
            finalizer,
            activity,
            voice: config.voice.clone(),
            events,
            export_ready,
            pool_pending: Arc::new(AtomicBool::new(false)),
        };
        (studio, events_rx)
    }

    /// Wire a studio to the HTTP backend described by `config.server`.
    pub fn from_config(
        config: &AppConfig,
        activity: ActivityLog,
    ) -> (Self, mpsc::UnboundedReceiver<StudioEvent>) {
        let client = Arc::new(HttpStudioClient::from_config(&config.server));
        Self::new(config, client.clone(), client.clone(), client, activity)
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Process commands until `commands` is closed, then wait for every
    /// generation and export task it started.
    pub async fn run(mut self, mut commands: mpsc::Receiver<StudioCommand>) {
        let mut tasks = JoinSet::new();

        while let Some(command) = commands.recv().await {
            match command {
                StudioCommand::Parse(raw) => {
                    if self.handle_parse(&raw) {
                        self.start_pool(&mut tasks);
                    }
                }
                StudioCommand::Edit { id, text } => self.handle_edit(id, text),
                StudioCommand::Generate(id) => self.start_single(&mut tasks, id),
                StudioCommand::GenerateAll => self.start_pool(&mut tasks),
                StudioCommand::ExportAll { title } => self.start_export(&mut tasks, title),
                StudioCommand::SetVoice(voice) => {
                    log::debug!("studio: voice set to {}", voice.model_type.as_str());
                    self.voice = voice;
                }
            }
            // Reap whatever has already finished.
            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    log::error!("studio task aborted: {e}");
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                log::error!("studio task aborted: {e}");
            }
        }
        log::info!("studio: command channel closed, shutting down");
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    /// Blank input leaves the current set alone.  Returns whether a new set
    /// was installed.
    fn handle_parse(&self, raw: &str) -> bool {
        if raw.trim().is_empty() {
            log::debug!("studio: ignoring blank parse input");
            return false;
        }
        let paragraphs = text::prepare(raw);
        let count = paragraphs.len();
        let ids = lock_registry(&self.registry).replace_all(paragraphs);

        self.activity.info(format!(
            "Parsed {count} paragraph(s), starting generation..."
        ));
        self.emit(StudioEvent::Parsed { count });
        for id in ids {
            self.emit(StudioEvent::ParagraphChanged {
                id,
                status: ParagraphStatus::Idle,
            });
        }
        self.report_export_ready();
        true
    }

    fn handle_edit(&self, id: ParagraphId, text: String) {
        let result = lock_registry(&self.registry).edit_text(id, text);
        match result {
            Ok(status) => {
                self.emit(StudioEvent::ParagraphChanged { id, status });
                self.report_export_ready();
            }
            Err(e) => self.emit(StudioEvent::Notice(e.to_string())),
        }
    }

    fn start_single(&self, tasks: &mut JoinSet<()>, id: ParagraphId) {
        let scheduler = self.scheduler.clone();
        let voice = self.voice.clone();
        let events = self.events.clone();
        tasks.spawn(async move {
            match scheduler.generate_one(id, &voice).await {
                Ok(_) => {}
                Err(SchedulerError::Precondition(e)) => {
                    let _ = events.send(StudioEvent::Notice(e.to_string()));
                }
                Err(e) => log::debug!("single generation for {id} not run: {e}"),
            }
        });
    }

    /// Request a pool run.  If one is already active the request is folded
    /// into a follow-up run once it finishes, so paragraphs parsed mid-run
    /// are still picked up.
    fn start_pool(&self, tasks: &mut JoinSet<()>) {
        self.pool_pending.store(true, Ordering::SeqCst);

        let scheduler = self.scheduler.clone();
        let voice = self.voice.clone();
        let events = self.events.clone();
        let pending = Arc::clone(&self.pool_pending);
        tasks.spawn(async move {
            while pending.swap(false, Ordering::SeqCst) {
                if scheduler.is_busy() {
                    if hand_off(&scheduler, &pending) {
                        break;
                    }
                    continue;
                }
                let _ = events.send(StudioEvent::PoolStarted);
                match scheduler.run_pool(&voice).await {
                    Ok(summary) => {
                        let _ = events.send(StudioEvent::PoolFinished(summary));
                    }
                    Err(SchedulerError::PoolBusy) => {
                        if hand_off(&scheduler, &pending) {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = events.send(StudioEvent::Notice(e.to_string()));
                        let _ = events.send(StudioEvent::PoolFinished(Default::default()));
                    }
                }
            }
        });
    }

    fn start_export(&self, tasks: &mut JoinSet<()>, title: String) {
        if !self.finalizer.is_ready() {
            self.emit(StudioEvent::Notice(
                "All paragraphs must be Ready to download".to_string(),
            ));
            return;
        }

        let finalizer = Arc::clone(&self.finalizer);
        let events = self.events.clone();
        tasks.spawn(async move {
            let event = match finalizer.export_all(&title).await {
                Ok(outcome) => StudioEvent::Exported {
                    path: outcome.path,
                    treated: outcome.treated,
                },
                Err(e) => StudioEvent::Notice(e.to_string()),
            };
            let _ = events.send(event);
        });
    }

    fn report_export_ready(&self) {
        let registry = lock_registry(&self.registry);
        self.export_ready.publish(&registry, &self.events);
    }

    fn emit(&self, event: StudioEvent) {
        // No receiver just means no front end is listening.
        let _ = self.events.send(event);
    }
}

/// Leave the pending request to the driver that owns the active pool.
/// Returns `false` when that pool ended in the meantime and the caller has to
/// run the request itself.
fn hand_off(scheduler: &GenerationScheduler, pending: &AtomicBool) -> bool {
    pending.store(true, Ordering::SeqCst);
    // The active driver re-checks `pending` only after its pool releases the
    // busy flag.
    scheduler.is_busy()
}

/// Last export availability reported, shared by the command loop and the
/// status forwarder so `ExportReady` is only sent on a flip.
#[derive(Clone, Default)]
struct ExportReadiness(Arc<Mutex<Option<bool>>>);

impl ExportReadiness {
    /// Compare `registry` with the last report and send `ExportReady` on a
    /// flip.  Callers hold the registry lock, so reports are ordered with
    /// the registry changes they describe.
    fn publish(&self, registry: &ParagraphRegistry, events: &mpsc::UnboundedSender<StudioEvent>) {
        let ready = registry.is_export_ready();
        let mut last = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if *last != Some(ready) {
            *last = Some(ready);
            let _ = events.send(StudioEvent::ExportReady(ready));
        }
    }
}

/// Turn scheduler status updates into events, adding `ExportReady` when
/// export availability flips.
async fn forward_status_updates(
    registry: SharedRegistry,
    mut updates: mpsc::UnboundedReceiver<StatusUpdate>,
    events: mpsc::UnboundedSender<StudioEvent>,
    export_ready: ExportReadiness,
) {
    while let Some((id, status)) = updates.recv().await {
        if events
            .send(StudioEvent::ParagraphChanged { id, status })
            .is_err()
        {
            continue;
        }
        export_ready.publish(&lock_registry(&registry), &events);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::client::{ApiError, GenerationRequest};
    use crate::config::ModelType;
    use crate::registry::AudioArtifact;
    use crate::scheduler::PoolSummary;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Echoes the text as audio; fails any paragraph containing "FAIL".
    struct Echo;

    #[async_trait]
    impl SpeechGenerator for Echo {
        async fn generate(&self, request: &GenerationRequest) -> Result<AudioArtifact, ApiError> {
            if request.text.contains("FAIL") {
                Err(ApiError::Status(500))
            } else {
                Ok(AudioArtifact::new(request.text.as_bytes().to_vec()))
            }
        }
    }

    struct Join;

    #[async_trait]
    impl SegmentMerger for Join {
        async fn merge(&self, segments: &[AudioArtifact]) -> Result<AudioArtifact, ApiError> {
            let joined: Vec<u8> = segments
                .iter()
                .flat_map(|s| s.as_bytes().iter().copied())
                .collect();
            Ok(AudioArtifact::new(joined))
        }
    }

    struct Untreated;

    #[async_trait]
    impl AudioTreater for Untreated {
        async fn treat(&self, _audio: &AudioArtifact, _treatment: &str) -> Result<AudioArtifact, ApiError> {
            Err(ApiError::Status(503))
        }
    }

    fn studio(config: &AppConfig) -> (Studio, mpsc::UnboundedReceiver<StudioEvent>) {
        Studio::new(
            config,
            Arc::new(Echo),
            Arc::new(Join),
            Arc::new(Untreated),
            ActivityLog::new(),
        )
    }

    /// Receive events until one matches, failing after a generous timeout.
    async fn wait_for(
        events: &mut mpsc::UnboundedReceiver<StudioEvent>,
        want: impl Fn(&StudioEvent) -> bool,
    ) -> StudioEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match events.recv().await {
                    Some(event) if want(&event) => return event,
                    Some(_) => continue,
                    None => panic!("event stream closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn parse_generates_and_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.export.output_dir = dir.path().to_path_buf();

        let (studio, mut events) = studio(&config);
        let registry = studio.registry();
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(studio.run(rx));

        tx.send(StudioCommand::Parse("Love your neighbor\nJohn 3:16 says this".into()))
            .await
            .unwrap();

        assert_eq!(
            wait_for(&mut events, |e| matches!(e, StudioEvent::Parsed { .. })).await,
            StudioEvent::Parsed { count: 2 }
        );
        let finished = wait_for(&mut events, |e| matches!(e, StudioEvent::PoolFinished(_))).await;
        assert_eq!(
            finished,
            StudioEvent::PoolFinished(PoolSummary {
                done: 2,
                failed: 0,
                skipped: 0
            })
        );
        assert!(lock_registry(&registry).is_export_ready());

        tx.send(StudioCommand::ExportAll {
            title: "My Psalm!! Reading".into(),
        })
        .await
        .unwrap();
        let exported = wait_for(&mut events, |e| matches!(e, StudioEvent::Exported { .. })).await;
        let expected = dir.path().join("My_Psalm_Reading.wav");
        assert_eq!(
            exported,
            StudioEvent::Exported {
                path: expected.clone(),
                treated: false
            }
        );
        assert_eq!(
            std::fs::read(expected).unwrap(),
            b"Love your neighbor.John 3. verse 16, says this.".to_vec()
        );

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn export_refused_until_every_paragraph_is_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.export.output_dir = dir.path().to_path_buf();

        let (studio, mut events) = studio(&config);
        let registry = studio.registry();
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(studio.run(rx));

        tx.send(StudioCommand::Parse("one\nFAIL two\nthree".into()))
            .await
            .unwrap();
        wait_for(&mut events, |e| matches!(e, StudioEvent::PoolFinished(_))).await;

        tx.send(StudioCommand::ExportAll { title: String::new() })
            .await
            .unwrap();
        assert_eq!(
            wait_for(&mut events, |e| matches!(e, StudioEvent::Notice(_))).await,
            StudioEvent::Notice("All paragraphs must be Ready to download".into())
        );

        // Fix the failing paragraph and regenerate just that one.
        let failed = lock_registry(&registry).paragraphs()[1].id();
        tx.send(StudioCommand::Edit {
            id: failed,
            text: "two.".into(),
        })
        .await
        .unwrap();
        tx.send(StudioCommand::Generate(failed)).await.unwrap();
        assert_eq!(
            wait_for(&mut events, |e| matches!(e, StudioEvent::ExportReady(true))).await,
            StudioEvent::ExportReady(true)
        );

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn missing_profile_is_a_notice() {
        let mut config = AppConfig::default();
        config.voice.model_type = ModelType::Base;

        let (studio, mut events) = studio(&config);
        let registry = studio.registry();
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(studio.run(rx));

        tx.send(StudioCommand::Parse("Hello".into())).await.unwrap();

        assert_eq!(
            wait_for(&mut events, |e| matches!(e, StudioEvent::Notice(_))).await,
            StudioEvent::Notice("Please select a saved voice profile first.".into())
        );
        drop(tx);
        handle.await.unwrap();
        assert_eq!(
            lock_registry(&registry).paragraphs()[0].status(),
            ParagraphStatus::Idle
        );
    }

    #[tokio::test]
    async fn late_update_from_replaced_set_does_not_report_ready() {
        let registry = new_shared_registry();
        let old = {
            let mut reg = lock_registry(&registry);
            let ids = reg.replace_all(vec!["old.".into()]);
            reg.begin_generation(ids[0]).unwrap();
            reg.complete_generation(ids[0], AudioArtifact::new(vec![1u8])).unwrap();
            ids[0]
        };
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let export_ready = ExportReadiness::default();
        export_ready.publish(&lock_registry(&registry), &events_tx);

        // Re-parse lands before the old set's completion is forwarded.
        lock_registry(&registry).replace_all(vec!["new.".into()]);
        export_ready.publish(&lock_registry(&registry), &events_tx);

        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        updates_tx.send((old, ParagraphStatus::Done)).unwrap();
        drop(updates_tx);
        forward_status_updates(registry, updates_rx, events_tx, export_ready).await;

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                StudioEvent::ExportReady(true),
                StudioEvent::ExportReady(false),
                StudioEvent::ParagraphChanged {
                    id: old,
                    status: ParagraphStatus::Done
                },
            ]
        );
    }

    #[tokio::test]
    async fn blank_parse_keeps_current_set() {
        let (studio, _events) = studio(&AppConfig::default());
        let registry = studio.registry();
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(studio.run(rx));

        tx.send(StudioCommand::Parse("Keep me".into())).await.unwrap();
        tx.send(StudioCommand::Parse("   \n ".into())).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let reg = lock_registry(&registry);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.paragraphs()[0].text(), "Keep me.");
    }

    #[tokio::test]
    async fn editing_unknown_paragraph_is_a_notice() {
        let (studio, mut events) = studio(&AppConfig::default());
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(studio.run(rx));

        tx.send(StudioCommand::Edit {
            id: ParagraphId(99),
            text: "x".into(),
        })
        .await
        .unwrap();

        assert!(matches!(
            wait_for(&mut events, |e| matches!(e, StudioEvent::Notice(_))).await,
            StudioEvent::Notice(_)
        ));
        drop(tx);
        handle.await.unwrap();
    }
}
