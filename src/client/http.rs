//! `HttpStudioClient`: the reqwest-backed implementation of every backend
//! trait.
//!
//! All connection details come from [`ServerConfig`]; nothing is hardcoded
//! apart from the endpoint paths.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};

use super::backend::{
    AudioTreater, ByteStream, ProfileService, ProgressSource, SegmentMerger, SpeechGenerator,
    UpdateService,
};
use super::error::{check_status, ApiError};
use super::request::GenerationRequest;
use super::types::{CreatedProfile, ReferenceAudio, UpdateInfo, VoiceProfile};
use crate::config::ServerConfig;
use crate::registry::AudioArtifact;

const WAV_MIME: &str = "audio/wav";

// ---------------------------------------------------------------------------
// HttpStudioClient
// ---------------------------------------------------------------------------

/// Talks to the studio backend over HTTP.
///
/// Two clients are kept: one with the per-request timeout from
/// `config.timeout_secs` for request/response calls, and one with only a
/// connect timeout for the long-lived progress stream.
#[derive(Clone)]
pub struct HttpStudioClient {
    client: reqwest::Client,
    stream_client: reqwest::Client,
    base_url: String,
}

impl HttpStudioClient {
    /// Build a client from application config.
    ///
    /// Falls back to a default client if the builder fails (should never
    /// happen in practice).
    pub fn from_config(config: &ServerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let stream_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            stream_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_for_audio(&self, path: &str, form: Form) -> Result<AudioArtifact, ApiError> {
        let response = self.client.post(self.url(path)).multipart(form).send().await?;
        let bytes = check_status(response)?.bytes().await?;
        audio_from_body(bytes.to_vec())
    }
}

/// A 2xx answer from an audio endpoint must carry audio.
fn audio_from_body(body: Vec<u8>) -> Result<AudioArtifact, ApiError> {
    if body.is_empty() {
        return Err(ApiError::Parse("empty audio body".into()));
    }
    Ok(AudioArtifact::new(body))
}

fn wav_part(audio: &AudioArtifact, file_name: String) -> Result<Part, ApiError> {
    Part::bytes(audio.as_bytes().to_vec())
        .file_name(file_name)
        .mime_str(WAV_MIME)
        .map_err(ApiError::from)
}

/// Form for `/api/merge`: one `files` part per segment, named in order.
pub(crate) fn merge_form(segments: &[AudioArtifact]) -> Result<Form, ApiError> {
    segments
        .iter()
        .enumerate()
        .try_fold(Form::new(), |form, (i, seg)| -> Result<Form, ApiError> {
            Ok(form.part("files", wav_part(seg, format!("segment_{i}.wav"))?))
        })
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

#[async_trait]
impl SpeechGenerator for HttpStudioClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<AudioArtifact, ApiError> {
        log::debug!(
            "POST /api/generate ({} chars, {})",
            request.text.len(),
            request.voice.model_type().as_str()
        );
        self.post_for_audio("/api/generate", request.to_form()).await
    }
}

#[async_trait]
impl SegmentMerger for HttpStudioClient {
    async fn merge(&self, segments: &[AudioArtifact]) -> Result<AudioArtifact, ApiError> {
        log::debug!("POST /api/merge ({} segments)", segments.len());
        self.post_for_audio("/api/merge", merge_form(segments)?).await
    }
}

#[async_trait]
impl AudioTreater for HttpStudioClient {
    async fn treat(&self, audio: &AudioArtifact, treatment: &str) -> Result<AudioArtifact, ApiError> {
        let form = Form::new()
            .part("audio_file", wav_part(audio, "merged.wav".to_string())?)
            .text("treatment_type", treatment.to_string());
        self.post_for_audio("/api/treat", form).await
    }
}

#[async_trait]
impl ProfileService for HttpStudioClient {
    async fn list_profiles(&self) -> Result<Vec<VoiceProfile>, ApiError> {
        let response = self.client.get(self.url("/api/profiles")).send().await?;
        check_status(response)?
            .json::<Vec<VoiceProfile>>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn create_profile(
        &self,
        name: &str,
        ref_text: &str,
        ref_audio: ReferenceAudio,
    ) -> Result<String, ApiError> {
        let audio = Part::bytes(ref_audio.bytes).file_name(ref_audio.file_name);
        let form = Form::new()
            .text("name", name.to_string())
            .text("ref_text", ref_text.to_string())
            .part("ref_audio", audio);

        let response = self
            .client
            .post(self.url("/api/profiles"))
            .multipart(form)
            .send()
            .await?;
        let created: CreatedProfile = check_status(response)?
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(created.id)
    }

    async fn delete_profile(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/profiles/{id}")))
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}

#[async_trait]
impl UpdateService for HttpStudioClient {
    async fn check_update(&self) -> Result<UpdateInfo, ApiError> {
        let response = self.client.get(self.url("/api/check_update")).send().await?;
        check_status(response)?
            .json::<UpdateInfo>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn apply_update(&self, download_url: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/api/do_update"))
            .multipart(Form::new().text("download_url", download_url.to_string()))
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }

    async fn probe(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .get(self.url("/"))
            .timeout(Duration::from_secs(5))
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}

#[async_trait]
impl ProgressSource for HttpStudioClient {
    async fn open_progress(&self) -> Result<ByteStream, ApiError> {
        let response = self
            .stream_client
            .get(self.url("/api/progress"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let stream = check_status(response)?
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(ApiError::from));
        Ok(Box::pin(stream))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn config(base_url: &str) -> ServerConfig {
        ServerConfig {
            base_url: base_url.into(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn empty_audio_body_is_an_error() {
        assert!(matches!(audio_from_body(Vec::new()), Err(ApiError::Parse(_))));
        assert_eq!(audio_from_body(vec![1, 2]).unwrap().as_bytes(), &[1, 2]);
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _client = HttpStudioClient::from_config(&ServerConfig::default());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = HttpStudioClient::from_config(&config("http://localhost:8001/"));
        assert_eq!(client.base_url(), "http://localhost:8001");
        assert_eq!(client.url("/api/merge"), "http://localhost:8001/api/merge");
    }

    #[test]
    fn merge_form_accepts_segments() {
        let segs = vec![AudioArtifact::new(vec![1u8]), AudioArtifact::new(vec![2u8])];
        assert!(merge_form(&segs).is_ok());
    }

    #[test]
    fn client_is_usable_as_every_trait_object() {
        let client = Arc::new(HttpStudioClient::from_config(&ServerConfig::default()));
        let _g: Arc<dyn SpeechGenerator> = client.clone();
        let _m: Arc<dyn SegmentMerger> = client.clone();
        let _t: Arc<dyn AudioTreater> = client.clone();
        let _p: Arc<dyn ProfileService> = client.clone();
        let _u: Arc<dyn UpdateService> = client.clone();
        let _s: Arc<dyn ProgressSource> = client;
    }

    #[tokio::test]
    async fn unreachable_server_is_a_request_error() {
        // Port 9 (discard) on localhost is essentially never listening.
        let client = HttpStudioClient::from_config(&config("http://127.0.0.1:9"));
        match client.list_profiles().await {
            Err(ApiError::Request(_)) | Err(ApiError::Timeout) => {}
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
