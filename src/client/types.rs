//! Wire types returned by the studio backend.

use serde::{Deserialize, Serialize};

/// A saved voice used by `Base` (voice-cloning) mode.  Owned by the backend;
/// this crate only lists, creates and deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub id: String,
    pub name: String,
    /// The backend's bundled profile.  Always present, never deletable.
    #[serde(default)]
    pub builtin: bool,
}

impl VoiceProfile {
    /// Name as shown in a picker; the builtin profile is starred.
    pub fn display_name(&self) -> String {
        if self.builtin {
            format!("\u{2B50} {}", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Response of a successful profile upload.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedProfile {
    pub id: String,
}

/// Reference audio attached to a new voice profile.
#[derive(Debug, Clone)]
pub struct ReferenceAudio {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Result of an update check.  Only `update_available` is guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub update_available: bool,
    #[serde(default)]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl UpdateInfo {
    /// The download URL, only when an update is actually on offer.
    pub fn offered_url(&self) -> Option<&str> {
        if self.update_available {
            self.download_url.as_deref().filter(|u| !u.is_empty())
        } else {
            None
        }
    }
}
