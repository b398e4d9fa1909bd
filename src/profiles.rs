//! Voice-profile management for `Base` (voice-cloning) mode.
//!
//! Profiles live on the backend.  This module lists them, picks a sensible
//! selection, and wraps create / delete with the local checks the backend
//! does not make (blank fields, deleting the builtin profile).

use std::sync::Arc;

use thiserror::Error;

use crate::activity::ActivityLog;
use crate::client::{ApiError, ProfileService, ReferenceAudio, VoiceProfile};
use crate::config::VoiceConfig;

/// Id the backend uses for its bundled profile.
pub const BUILTIN_PROFILE_ID: &str = "__builtin_default__";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Please fill in all fields to save a profile.")]
    MissingFields,

    #[error("the built-in voice profile cannot be deleted")]
    BuiltinProtected,

    #[error("no voice profile with id {0:?}")]
    NotFound(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The profile list plus the selection that should be in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileListing {
    pub profiles: Vec<VoiceProfile>,
    pub selected: Option<String>,
}

impl ProfileListing {
    pub fn selected_profile(&self) -> Option<&VoiceProfile> {
        let id = self.selected.as_deref()?;
        self.profiles.iter().find(|p| p.id == id)
    }
}

/// Keep `current` if it is still listed, otherwise fall back to the builtin
/// profile (if the backend has one).
pub fn resolve_selection(profiles: &[VoiceProfile], current: Option<&str>) -> Option<String> {
    let current = current.map(str::trim).filter(|id| !id.is_empty());
    if let Some(id) = current {
        if profiles.iter().any(|p| p.id == id) {
            return Some(id.to_string());
        }
    }
    profiles.iter().find(|p| p.builtin).map(|p| p.id.clone())
}

pub struct ProfileManager {
    service: Arc<dyn ProfileService>,
    activity: ActivityLog,
}

impl ProfileManager {
    pub fn new(service: Arc<dyn ProfileService>, activity: ActivityLog) -> Self {
        Self { service, activity }
    }

    /// Fetch the profiles and resolve the selection against `current`.
    pub async fn refresh(&self, current: Option<&str>) -> Result<ProfileListing, ProfileError> {
        let profiles = self.service.list_profiles().await.map_err(|e| {
            log::error!("failed to load profiles: {e}");
            e
        })?;
        let selected = resolve_selection(&profiles, current);
        Ok(ProfileListing { profiles, selected })
    }

    /// Resolve `voice.profile_id` against the backend before a run in a
    /// profile-based mode: a missing or stale id becomes the builtin
    /// profile.  Other modes are left alone without a remote call.
    pub async fn select_for(&self, voice: &mut VoiceConfig) -> Result<(), ProfileError> {
        if !voice.model_type.requires_profile() {
            return Ok(());
        }
        let listing = self.refresh(voice.profile_id.as_deref()).await?;
        if let Some(profile) = listing.selected_profile() {
            if voice.profile_id.as_deref() != Some(profile.id.as_str()) {
                self.activity
                    .info(format!("Using voice profile: {}", profile.display_name()));
            }
        }
        voice.profile_id = listing.selected;
        Ok(())
    }

    /// Upload a new profile.  Returns its id, which should become the
    /// selection.
    pub async fn create(
        &self,
        name: &str,
        ref_text: &str,
        ref_audio: ReferenceAudio,
    ) -> Result<String, ProfileError> {
        let (name, ref_text) = (name.trim(), ref_text.trim());
        if name.is_empty() || ref_text.is_empty() || ref_audio.bytes.is_empty() {
            return Err(ProfileError::MissingFields);
        }

        match self.service.create_profile(name, ref_text, ref_audio).await {
            Ok(id) => {
                self.activity.ok(format!("Saved voice profile: {name}"));
                Ok(id)
            }
            Err(e) => {
                self.activity.error(format!("Error saving profile: {e}"));
                Err(e.into())
            }
        }
    }

    /// Delete a user profile.  The builtin profile is refused without a
    /// remote call.
    pub async fn delete(&self, id: &str) -> Result<(), ProfileError> {
        if id == BUILTIN_PROFILE_ID {
            return Err(ProfileError::BuiltinProtected);
        }
        let profiles = self.service.list_profiles().await?;
        let profile = profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        if profile.builtin {
            return Err(ProfileError::BuiltinProtected);
        }

        match self.service.delete_profile(id).await {
            Ok(()) => {
                self.activity
                    .info(format!("Deleted voice profile: {}", profile.name));
                Ok(())
            }
            Err(e) => {
                self.activity.error(format!("Error deleting profile: {e}"));
                Err(e.into())
            }
        }
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

    use crate::config::ModelType;

    /// In-memory backend.
    struct Memory {
        profiles: Mutex<Vec<VoiceProfile>>,
        deletes: Mutex<Vec<String>>,
    }

    impl Memory {
        fn with_builtin() -> Self {
            Self {
                profiles: Mutex::new(vec![profile(BUILTIN_PROFILE_ID, "Default", true)]),
                deletes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProfileService for Memory {
        async fn list_profiles(&self) -> Result<Vec<VoiceProfile>, ApiError> {
            Ok(self.profiles.lock().unwrap().clone())
        }

        async fn create_profile(
            &self,
            name: &str,
            _ref_text: &str,
            _ref_audio: ReferenceAudio,
        ) -> Result<String, ApiError> {
            let mut profiles = self.profiles.lock().unwrap();
            let id = format!("user-{}", profiles.len());
            profiles.push(profile(&id, name, false));
            Ok(id)
        }

        async fn delete_profile(&self, id: &str) -> Result<(), ApiError> {
            self.deletes.lock().unwrap().push(id.to_string());
            self.profiles.lock().unwrap().retain(|p| p.id != id);
            Ok(())
        }
    }

    struct Down;

    #[async_trait]
    impl ProfileService for Down {
        async fn list_profiles(&self) -> Result<Vec<VoiceProfile>, ApiError> {
            Err(ApiError::Status(502))
        }
        async fn create_profile(&self, _: &str, _: &str, _: ReferenceAudio) -> Result<String, ApiError> {
            Err(ApiError::Status(502))
        }
        async fn delete_profile(&self, _: &str) -> Result<(), ApiError> {
            Err(ApiError::Status(502))
        }
    }

    fn profile(id: &str, name: &str, builtin: bool) -> VoiceProfile {
        VoiceProfile {
            id: id.into(),
            name: name.into(),
            builtin,
        }
    }

    fn audio() -> ReferenceAudio {
        ReferenceAudio {
            file_name: "me.wav".into(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn builtin_is_selected_when_nothing_chosen() {
        let profiles = vec![profile("a", "Mine", false), profile(BUILTIN_PROFILE_ID, "Default", true)];
        assert_eq!(
            resolve_selection(&profiles, None).as_deref(),
            Some(BUILTIN_PROFILE_ID)
        );
        assert_eq!(
            resolve_selection(&profiles, Some("")).as_deref(),
            Some(BUILTIN_PROFILE_ID)
        );
    }

    #[test]
    fn existing_selection_is_kept() {
        let profiles = vec![profile(BUILTIN_PROFILE_ID, "Default", true), profile("a", "Mine", false)];
        assert_eq!(resolve_selection(&profiles, Some("a")).as_deref(), Some("a"));
    }

    #[test]
    fn stale_selection_falls_back_to_builtin() {
        let profiles = vec![profile(BUILTIN_PROFILE_ID, "Default", true)];
        assert_eq!(
            resolve_selection(&profiles, Some("gone")).as_deref(),
            Some(BUILTIN_PROFILE_ID)
        );
        assert_eq!(resolve_selection(&[], Some("gone")), None);
    }

    #[tokio::test]
    async fn create_then_refresh_selects_new_profile() {
        let manager = ProfileManager::new(Arc::new(Memory::with_builtin()), ActivityLog::new());

        let id = manager.create("Narrator", "Hello there.", audio()).await.unwrap();
        let listing = manager.refresh(Some(&id)).await.unwrap();

        assert_eq!(listing.selected.as_deref(), Some(id.as_str()));
        assert!(listing.selected_profile().is_some_and(|p| !p.builtin));
        assert_eq!(listing.profiles.len(), 2);
    }

    #[tokio::test]
    async fn base_mode_without_profile_gets_builtin() {
        let activity = ActivityLog::new();
        let manager = ProfileManager::new(Arc::new(Memory::with_builtin()), activity.clone());
        let mut voice = VoiceConfig {
            model_type: ModelType::Base,
            profile_id: None,
            ..VoiceConfig::default()
        };

        manager.select_for(&mut voice).await.unwrap();

        assert_eq!(voice.profile_id.as_deref(), Some(BUILTIN_PROFILE_ID));
        assert!(crate::client::validate_voice(&voice).is_ok());
        assert_eq!(activity.len(), 1);
    }

    #[tokio::test]
    async fn base_mode_keeps_listed_profile() {
        let manager = ProfileManager::new(Arc::new(Memory::with_builtin()), ActivityLog::new());
        let id = manager.create("Narrator", "Hello there.", audio()).await.unwrap();
        let mut voice = VoiceConfig {
            model_type: ModelType::Base,
            profile_id: Some(id.clone()),
            ..VoiceConfig::default()
        };

        manager.select_for(&mut voice).await.unwrap();

        assert_eq!(voice.profile_id, Some(id));
    }

    #[tokio::test]
    async fn other_modes_skip_the_profile_list() {
        let manager = ProfileManager::new(Arc::new(Down), ActivityLog::new());
        let mut voice = VoiceConfig::default();

        manager.select_for(&mut voice).await.unwrap();

        assert_eq!(voice.profile_id, None);
    }

    #[tokio::test]
    async fn create_requires_every_field() {
        let manager = ProfileManager::new(Arc::new(Memory::with_builtin()), ActivityLog::new());
        assert!(matches!(
            manager.create("  ", "text", audio()).await,
            Err(ProfileError::MissingFields)
        ));
        let silent = ReferenceAudio {
            file_name: "x.wav".into(),
            bytes: Vec::new(),
        };
        assert!(matches!(
            manager.create("Name", "text", silent).await,
            Err(ProfileError::MissingFields)
        ));
    }

    #[tokio::test]
    async fn builtin_delete_is_refused_locally() {
        let backend = Arc::new(Memory::with_builtin());
        let manager = ProfileManager::new(backend.clone(), ActivityLog::new());

        assert!(matches!(
            manager.delete(BUILTIN_PROFILE_ID).await,
            Err(ProfileError::BuiltinProtected)
        ));
        assert!(backend.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_profile_delete_reaches_backend() {
        let backend = Arc::new(Memory::with_builtin());
        let activity = ActivityLog::new();
        let manager = ProfileManager::new(backend.clone(), activity.clone());
        let id = manager.create("Temp", "Words.", audio()).await.unwrap();

        manager.delete(&id).await.unwrap();

        assert_eq!(*backend.deletes.lock().unwrap(), vec![id.clone()]);
        assert!(activity
            .messages()
            .contains(&"Deleted voice profile: Temp".to_string()));
        let listing = manager.refresh(Some(&id)).await.unwrap();
        assert_eq!(listing.selected.as_deref(), Some(BUILTIN_PROFILE_ID));
    }

    #[tokio::test]
    async fn unknown_profile_delete_is_not_found() {
        let manager = ProfileManager::new(Arc::new(Memory::with_builtin()), ActivityLog::new());
        assert!(matches!(
            manager.delete("nope").await,
            Err(ProfileError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn backend_errors_propagate() {
        let manager = ProfileManager::new(Arc::new(Down), ActivityLog::new());
        assert!(matches!(
            manager.refresh(None).await,
            Err(ProfileError::Api(ApiError::Status(502)))
        ));
    }
}
