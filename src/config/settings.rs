//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ModelType
// ---------------------------------------------------------------------------

/// Selects which synthesis model family (and therefore which voice fields)
/// a generation request uses.
///
/// | Variant       | Extra request field      |
/// |---------------|--------------------------|
/// | `CustomVoice` | `speaker`                |
/// | `VoiceDesign` | `voice_design_prompt`    |
/// | `Base`        | `profile_id` (required)  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    /// One of the model's built-in speakers.
    CustomVoice,
    /// A voice described by a free-text prompt.
    VoiceDesign,
    /// Voice cloning from a saved voice profile.
    Base,
}

impl ModelType {
    /// The value sent in the `model_type` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::CustomVoice => "CustomVoice",
            ModelType::VoiceDesign => "VoiceDesign",
            ModelType::Base => "Base",
        }
    }

    /// Returns `true` when this mode cannot run without a saved voice profile.
    pub fn requires_profile(&self) -> bool {
        matches!(self, ModelType::Base)
    }
}

impl Default for ModelType {
    fn default() -> Self {
        Self::CustomVoice
    }
}

/// Model sizes the generation service accepts.
pub const VALID_MODEL_SIZES: [&str; 2] = ["0.6B", "1.7B"];

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Where the synthesis / merge / treatment service lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the studio backend, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout for generation, merge and treatment calls.
    ///
    /// Generation on CPU can take minutes for a long paragraph, so the
    /// default is generous.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8001".into(),
            timeout_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Voice parameters copied into every generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Spoken language name as the service expects it (e.g. `"English"`).
    pub language: String,
    /// Model size, one of [`VALID_MODEL_SIZES`].
    pub model_size: String,
    /// Model family.
    pub model_type: ModelType,
    /// Built-in speaker used in `CustomVoice` mode.
    pub speaker: String,
    /// Voice description used in `VoiceDesign` mode.
    pub voice_design_prompt: Option<String>,
    /// Saved voice profile used in `Base` mode.
    pub profile_id: Option<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "English".into(),
            model_size: "1.7B".into(),
            model_type: ModelType::default(),
            speaker: "Vivian".into(),
            voice_design_prompt: None,
            profile_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// PoolConfig
// ---------------------------------------------------------------------------

/// Generation pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of generation calls in flight at once.
    pub concurrency: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { concurrency: 3 }
    }
}

// ---------------------------------------------------------------------------
// ExportConfig
// ---------------------------------------------------------------------------

/// Settings for the merge → treatment → export step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory the finished narration is written into.
    pub output_dir: std::path::PathBuf,
    /// Treatment profile sent to the treatment service.
    pub treatment: String,
    /// Title used when the user leaves the title blank.
    pub fallback_title: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: std::path::PathBuf::from("."),
            treatment: "clear".into(),
            fallback_title: "Narration".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UpdateConfig
// ---------------------------------------------------------------------------

/// How long to wait for the server to come back after applying an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Seconds between reachability probes.
    pub poll_interval_secs: u64,
    /// Probes attempted before giving up.
    pub max_polls: u32,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            max_polls: 90,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use narration_studio::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend location.
    pub server: ServerConfig,
    /// Voice selection.
    pub voice: VoiceConfig,
    /// Generation pool settings.
    pub pool: PoolConfig,
    /// Export settings.
    pub export: ExportConfig,
    /// Self-update polling.
    pub update: UpdateConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
