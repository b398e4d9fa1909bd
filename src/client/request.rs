//! Generation request construction and local precondition checks.

use thiserror::Error;

use crate::config::{ModelType, VoiceConfig, VALID_MODEL_SIZES};

// ---------------------------------------------------------------------------
// PreconditionError
// ---------------------------------------------------------------------------

/// A request that must not be sent at all.  Raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("Please select a saved voice profile first.")]
    MissingProfile,

    #[error("unsupported model size {0:?} (expected one of 0.6B, 1.7B)")]
    InvalidModelSize(String),
}

// ---------------------------------------------------------------------------
// VoiceParams
// ---------------------------------------------------------------------------

/// The mode-specific part of a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceParams {
    /// `CustomVoice`: a built-in speaker name.
    Speaker(String),
    /// `VoiceDesign`: a free-text voice description (may be empty; the
    /// service rejects that remotely).
    Design(String),
    /// `Base`: a saved voice-profile id.
    Profile(String),
}

impl VoiceParams {
    pub fn model_type(&self) -> ModelType {
        match self {
            VoiceParams::Speaker(_) => ModelType::CustomVoice,
            VoiceParams::Design(_) => ModelType::VoiceDesign,
            VoiceParams::Profile(_) => ModelType::Base,
        }
    }

    /// `(field name, value)` for the form.
    fn field(&self) -> (&'static str, &str) {
        match self {
            VoiceParams::Speaker(s) => ("speaker", s.as_str()),
            VoiceParams::Design(p) => ("voice_design_prompt", p.as_str()),
            VoiceParams::Profile(id) => ("profile_id", id.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationRequest
// ---------------------------------------------------------------------------

/// Parameters for one paragraph's generation call.  Built fresh for every
/// attempt and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub text: String,
    pub language: String,
    pub model_size: String,
    pub voice: VoiceParams,
}

impl GenerationRequest {
    /// Validate the voice selection and build a request for `text`.
    ///
    /// ```
    /// use narration_studio::client::{GenerationRequest, PreconditionError};
    /// use narration_studio::config::{ModelType, VoiceConfig};
    ///
    /// let mut voice = VoiceConfig::default();
    /// voice.model_type = ModelType::Base;
    /// assert_eq!(
    ///     GenerationRequest::build("Hello.", &voice),
    ///     Err(PreconditionError::MissingProfile)
    /// );
    /// ```
    pub fn build(text: &str, voice: &VoiceConfig) -> Result<Self, PreconditionError> {
        validate_voice(voice)?;

        let params = match voice.model_type {
            ModelType::CustomVoice => VoiceParams::Speaker(voice.speaker.clone()),
            ModelType::VoiceDesign => {
                VoiceParams::Design(voice.voice_design_prompt.clone().unwrap_or_default())
            }
            ModelType::Base => match selected_profile(voice) {
                Some(id) => VoiceParams::Profile(id.to_string()),
                None => return Err(PreconditionError::MissingProfile),
            },
        };

        Ok(Self {
            text: text.to_string(),
            language: voice.language.clone(),
            model_size: voice.model_size.clone(),
            voice: params,
        })
    }

    /// Text fields in the order the service expects them.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let (voice_field, voice_value) = self.voice.field();
        vec![
            ("text", self.text.clone()),
            ("language", self.language.clone()),
            ("model_size", self.model_size.clone()),
            ("model_type", self.voice.model_type().as_str().to_string()),
            (voice_field, voice_value.to_string()),
        ]
    }

    pub fn to_form(&self) -> reqwest::multipart::Form {
        self.form_fields()
            .into_iter()
            .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                form.text(name, value)
            })
    }
}

/// Check the parts of a voice selection that do not depend on the text.
/// The pool runs this once up front so a bad selection fails fast.
pub fn validate_voice(voice: &VoiceConfig) -> Result<(), PreconditionError> {
    if !VALID_MODEL_SIZES.contains(&voice.model_size.as_str()) {
        return Err(PreconditionError::InvalidModelSize(voice.model_size.clone()));
    }
    if voice.model_type.requires_profile() && selected_profile(voice).is_none() {
        return Err(PreconditionError::MissingProfile);
    }
    Ok(())
}

fn selected_profile(voice: &VoiceConfig) -> Option<&str> {
    voice
        .profile_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
