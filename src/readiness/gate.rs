//! The readiness gate: follows the model status stream until it reports a
//! terminal state.
//!
//! Purely observational.  Nothing in the scheduler or the finalization
//! pipeline waits on it; generation attempted while the model is still
//! downloading simply fails remotely and lands as `Error`.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::watch;

use crate::client::ProgressSource;

use super::sse::SseDecoder;

// ---------------------------------------------------------------------------
// ModelStatus
// ---------------------------------------------------------------------------

/// What the backend says about its model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModelStatus {
    /// Nothing reported yet, or a status this client does not know.
    #[default]
    Idle,
    Downloading {
        /// Whole percent, 0 to 100.
        progress: u8,
        description: Option<String>,
    },
    Ready,
    Error {
        description: Option<String>,
    },
}

impl ModelStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ModelStatus::Ready | ModelStatus::Error { .. })
    }

    /// Badge text.
    pub fn label(&self) -> String {
        match self {
            ModelStatus::Idle => "Model Status: Idle".to_string(),
            ModelStatus::Downloading { progress, .. } => {
                format!("Downloading Model... {progress}%")
            }
            ModelStatus::Ready => "Model Ready".to_string(),
            ModelStatus::Error { .. } => "Model Error".to_string(),
        }
    }

    /// Interpret one event payload.  `None` only when it is not JSON at
    /// all; any JSON without a recognised string `status` reads as `Idle`.
    pub fn from_payload(payload: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(payload).ok()?;
        let description = value
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(match value.get("status").and_then(Value::as_str) {
            Some("downloading") => ModelStatus::Downloading {
                progress: clamp_percent(
                    value.get("progress").and_then(Value::as_f64).unwrap_or(0.0),
                ),
                description,
            },
            Some("ready") => ModelStatus::Ready,
            Some("error") => ModelStatus::Error { description },
            _ => ModelStatus::Idle,
        })
    }
}

/// Clamp to [0, 100] and floor.
fn clamp_percent(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).floor() as u8
}

// ---------------------------------------------------------------------------
// GateState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GateState {
    pub status: ModelStatus,
    /// Set once the subscription is over (terminal status or transport
    /// failure).  Never cleared.
    pub finished: bool,
}

// ---------------------------------------------------------------------------
// ReadinessGate
// ---------------------------------------------------------------------------

/// Latching observer of the model status.  Publish-only: readers hold a
/// [`watch::Receiver`] from [`subscribe`](Self::subscribe).
pub struct ReadinessGate {
    state: watch::Sender<GateState>,
    latched: AtomicBool,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::default());
        Self {
            state,
            latched: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> GateState {
        self.state.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.latched.load(Ordering::SeqCst)
    }

    /// Apply one event payload.  Ignored once latched; an unparseable
    /// payload is logged and ignored.  Returns `true` while the gate is
    /// still listening.
    pub fn apply_payload(&self, payload: &str) -> bool {
        if self.is_finished() {
            return false;
        }
        let Some(status) = ModelStatus::from_payload(payload) else {
            log::warn!("unparseable progress event: {payload:?}");
            return true;
        };

        let terminal = status.is_terminal();
        match &status {
            ModelStatus::Error { description } => {
                log::error!(
                    "model error: {}",
                    description.as_deref().unwrap_or("no description")
                );
            }
            ModelStatus::Ready => log::info!("model ready"),
            _ => log::debug!("model status: {}", status.label()),
        }

        if terminal {
            self.latched.store(true, Ordering::SeqCst);
        }
        self.state.send_replace(GateState {
            status,
            finished: terminal,
        });
        !terminal
    }

    /// The stream itself failed or ended: stop for good, keep the last
    /// status.
    pub fn latch(&self, reason: &str) {
        if self.latched.swap(true, Ordering::SeqCst) {
            return;
        }
        log::debug!("progress stream closed: {reason}");
        self.state.send_modify(|s| s.finished = true);
    }

    /// Subscribe to `source` and process events until a terminal status or a
    /// transport error.  Never reconnects.  Returns the final state.
    pub async fn follow(&self, source: &dyn ProgressSource) -> GateState {
        if self.is_finished() {
            return self.current();
        }

        let mut stream = match source.open_progress().await {
            Ok(stream) => stream,
            Err(e) => {
                self.latch(&e.to_string());
                return self.current();
            }
        };

        let mut decoder = SseDecoder::new();
        'events: loop {
            match stream.next().await {
                Some(Ok(chunk)) => {
                    for payload in decoder.push(&chunk) {
                        if !self.apply_payload(&payload) {
                            break 'events;
                        }
                    }
                }
                Some(Err(e)) => {
                    self.latch(&e.to_string());
                    break;
                }
                None => {
                    self.latch("end of stream");
                    break;
                }
            }
        }
        // Dropping the stream closes the connection.
        self.current()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
