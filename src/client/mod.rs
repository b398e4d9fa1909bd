//! Client for the studio backend: generation, merge, treatment, voice
//! profiles, self-update and the model progress stream.
//!
//! This module provides:
//! * [`GenerationRequest`]: one paragraph's request, validated locally.
//! * The backend traits ([`SpeechGenerator`], [`SegmentMerger`],
//!   [`AudioTreater`], [`ProfileService`], [`UpdateService`],
//!   [`ProgressSource`]).
//! * [`HttpStudioClient`]: the reqwest implementation of all of them.
//! * [`ApiError`] / [`PreconditionError`].

pub mod backend;
pub mod error;
pub mod http;
pub mod request;
pub mod types;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use backend::{
    AudioTreater, ByteStream, ProfileService, ProgressSource, SegmentMerger, SpeechGenerator,
    UpdateService,
};
pub use error::ApiError;
pub use http::HttpStudioClient;
pub use request::{validate_voice, GenerationRequest, PreconditionError, VoiceParams};
pub use types::{ReferenceAudio, UpdateInfo, VoiceProfile};
