//! Traits for the remote collaborators.
//!
//! The scheduler, finalization pipeline, profile manager and updater only
//! see these traits, so they can be driven by [`HttpStudioClient`] in
//! production and by small in-memory doubles in tests.
//!
//! Implementors must be `Send + Sync` so they can be shared across tasks as
//! `Arc<dyn …>`.
//!
//! [`HttpStudioClient`]: crate::client::HttpStudioClient

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use super::error::ApiError;
use super::request::GenerationRequest;
use super::types::{ReferenceAudio, UpdateInfo, VoiceProfile};
use crate::registry::AudioArtifact;

/// Raw body chunks of the progress stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ApiError>> + Send>>;

/// Synthesizes one paragraph.
#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<AudioArtifact, ApiError>;
}

/// Concatenates segments, in the order given, into one file.
#[async_trait]
pub trait SegmentMerger: Send + Sync {
    async fn merge(&self, segments: &[AudioArtifact]) -> Result<AudioArtifact, ApiError>;
}

/// Applies a named enhancement profile to finished audio.
#[async_trait]
pub trait AudioTreater: Send + Sync {
    async fn treat(&self, audio: &AudioArtifact, treatment: &str) -> Result<AudioArtifact, ApiError>;
}

/// Saved voice profiles.
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn list_profiles(&self) -> Result<Vec<VoiceProfile>, ApiError>;

    /// Upload a new profile and return its id.
    async fn create_profile(
        &self,
        name: &str,
        ref_text: &str,
        ref_audio: ReferenceAudio,
    ) -> Result<String, ApiError>;

    async fn delete_profile(&self, id: &str) -> Result<(), ApiError>;
}

/// Self-update endpoints.
#[async_trait]
pub trait UpdateService: Send + Sync {
    async fn check_update(&self) -> Result<UpdateInfo, ApiError>;

    /// Ask the backend to install an update.  The backend restarts itself, so
    /// a transport error here is expected.
    async fn apply_update(&self, download_url: &str) -> Result<(), ApiError>;

    /// `Ok` once the backend answers again.
    async fn probe(&self) -> Result<(), ApiError>;
}

/// Server-push model status.
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn open_progress(&self) -> Result<ByteStream, ApiError>;
}

// Compile-time assertion: every trait must be usable as a trait object.
const _: fn() = || {
    fn _assert_object_safe(
        _: Box<dyn SpeechGenerator>,
        _: Box<dyn SegmentMerger>,
        _: Box<dyn AudioTreater>,
        _: Box<dyn ProfileService>,
        _: Box<dyn UpdateService>,
        _: Box<dyn ProgressSource>,
    ) {
    }
};
