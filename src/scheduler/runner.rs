//! Generation scheduler: the bounded worker pool and single-paragraph
//! attempts.
//!
//! # Pool flow
//!
//! ```text
//! run_pool(voice)
//!   ├─ busy flag set?          → Err(PoolBusy)
//!   ├─ validate_voice(voice)   → Err(Precondition)      (no paragraph touched)
//!   └─ queue = eligible ids (ascending index)
//!        spawn min(K, queue) workers in a JoinSet
//!          worker: loop { pop front → attempt } until queue empty
//!        join all workers        → PoolSummary
//! ```
//!
//! A worker pops its next id as soon as its current call resolves, so the
//! number of calls in flight stays at `min(K, remaining)` until the queue
//! drains.  The registry lock is only ever held between awaits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::activity::ActivityLog;
use crate::client::{validate_voice, GenerationRequest, SpeechGenerator};
use crate::config::VoiceConfig;
use crate::registry::{lock_registry, ParagraphId, ParagraphStatus, RegistryError, SharedRegistry};

use super::error::SchedulerError;

/// `(paragraph, new status)` pushed whenever an attempt moves a paragraph.
pub type StatusUpdate = (ParagraphId, ParagraphStatus);

// ---------------------------------------------------------------------------
// PoolSummary
// ---------------------------------------------------------------------------

/// Tally of one pool run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub done: usize,
    pub failed: usize,
    /// Popped but not attempted: claimed elsewhere, or discarded by a
    /// re-parse while queued.
    pub skipped: usize,
}

impl PoolSummary {
    fn absorb(&mut self, other: PoolSummary) {
        self.done += other.done;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

// ---------------------------------------------------------------------------
// GenerationScheduler
// ---------------------------------------------------------------------------

/// Drives paragraphs from eligible to `Done`/`Error` through a
/// [`SpeechGenerator`].  Cheap to clone; clones share the busy flag.
#[derive(Clone)]
pub struct GenerationScheduler {
    registry: SharedRegistry,
    generator: Arc<dyn SpeechGenerator>,
    activity: ActivityLog,
    concurrency: usize,
    busy: Arc<AtomicBool>,
    updates: Option<mpsc::UnboundedSender<StatusUpdate>>,
}

impl GenerationScheduler {
    /// `concurrency` is clamped to at least 1.
    pub fn new(
        registry: SharedRegistry,
        generator: Arc<dyn SpeechGenerator>,
        activity: ActivityLog,
        concurrency: usize,
    ) -> Self {
        Self {
            registry,
            generator,
            activity,
            concurrency: concurrency.max(1),
            busy: Arc::new(AtomicBool::new(false)),
            updates: None,
        }
    }

    /// Send every status change on `tx` as well.
    pub fn with_status_updates(mut self, tx: mpsc::UnboundedSender<StatusUpdate>) -> Self {
        self.updates = Some(tx);
        self
    }

    /// `true` while a pool run is active.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Pool
    // -----------------------------------------------------------------------

    /// Generate every eligible paragraph with at most `concurrency` calls in
    /// flight.  Individual failures land as `Error` on their paragraph and
    /// never stop the run.
    pub async fn run_pool(&self, voice: &VoiceConfig) -> Result<PoolSummary, SchedulerError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SchedulerError::PoolBusy);
        }
        let _busy = BusyGuard(self.busy.clone());

        if let Err(e) = validate_voice(voice) {
            self.activity.error(e.to_string());
            return Err(e.into());
        }

        let queue: VecDeque<ParagraphId> = lock_registry(&self.registry).eligible_ids().into();
        if queue.is_empty() {
            log::debug!("run_pool: nothing eligible");
            return Ok(PoolSummary::default());
        }

        let workers = self.concurrency.min(queue.len());
        log::info!(
            "generation pool: {} paragraph(s), {} worker(s)",
            queue.len(),
            workers
        );

        let queue = Arc::new(Mutex::new(queue));
        let mut set = JoinSet::new();
        for _ in 0..workers {
            let scheduler = self.clone();
            let queue = Arc::clone(&queue);
            let voice = voice.clone();
            set.spawn(async move { scheduler.worker(queue, voice).await });
        }

        let mut summary = PoolSummary::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(tally) => summary.absorb(tally),
                Err(e) => log::error!("generation worker aborted: {e}"),
            }
        }

        self.activity.ok("All done.");
        Ok(summary)
    }

    async fn worker(&self, queue: Arc<Mutex<VecDeque<ParagraphId>>>, voice: VoiceConfig) -> PoolSummary {
        let mut tally = PoolSummary::default();
        loop {
            let next = queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(id) = next else { break };

            match self.attempt(id, &voice).await {
                Ok(ParagraphStatus::Done) => tally.done += 1,
                Ok(_) => tally.failed += 1,
                Err(e) => {
                    log::debug!("skipping {id}: {e}");
                    tally.skipped += 1;
                }
            }
        }
        tally
    }

    // -----------------------------------------------------------------------
    // Single attempt
    // -----------------------------------------------------------------------

    /// One attempt for one paragraph, outside the pool.  Refused while a call
    /// for the same paragraph is already in flight.
    pub async fn generate_one(
        &self,
        id: ParagraphId,
        voice: &VoiceConfig,
    ) -> Result<ParagraphStatus, SchedulerError> {
        self.attempt(id, voice).await
    }

    /// Claim, call, record.  A remote failure is `Ok(Error)`; `Err` means the
    /// attempt never reached the network or its result had nowhere to land.
    async fn attempt(
        &self,
        id: ParagraphId,
        voice: &VoiceConfig,
    ) -> Result<ParagraphStatus, SchedulerError> {
        let (text, number) = {
            let mut registry = lock_registry(&self.registry);
            let text = registry.begin_generation(id)?;
            let number = registry.get(id).map(|p| p.index() + 1).unwrap_or_default();
            (text, number)
        };
        self.notify(id, ParagraphStatus::Generating);

        let request = match GenerationRequest::build(&text, voice) {
            Ok(request) => request,
            Err(e) => {
                if let Err(revert) = lock_registry(&self.registry).revert_to_idle(id) {
                    log::debug!("revert after precondition failure: {revert}");
                }
                self.notify(id, ParagraphStatus::Idle);
                self.activity.error(e.to_string());
                return Err(e.into());
            }
        };

        self.activity.info(format!("Generating para {number}..."));
        let result = self.generator.generate(&request).await;

        let recorded = {
            let mut registry = lock_registry(&self.registry);
            match result {
                Ok(artifact) => registry
                    .complete_generation(id, artifact)
                    .map(|()| ParagraphStatus::Done),
                Err(e) => {
                    log::warn!("generation failed for {id}: {e}");
                    registry
                        .fail_generation(id)
                        .map(|()| ParagraphStatus::Error)
                }
            }
        };

        match recorded {
            Ok(status) => {
                self.notify(id, status);
                if status == ParagraphStatus::Done {
                    self.activity.ok(format!("Para {number} ready."));
                } else {
                    self.activity.error(format!("Para {number} failed."));
                }
                Ok(status)
            }
            Err(e @ RegistryError::UnknownParagraph(_)) => {
                log::info!("dropping result for {id}: paragraph set was replaced");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn notify(&self, id: ParagraphId, status: ParagraphStatus) {
        if let Some(tx) = &self.updates {
            // Receiver gone just means nobody is watching.
            let _ = tx.send((id, status));
        }
    }
}

/// Clears the busy flag when the pool run ends, however it ends.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
