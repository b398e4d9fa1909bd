//! Command-line interface for narration-studio.
//!
//! Argument parsing only; the commands themselves live in `main.rs`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{AppConfig, ModelType};

/// Turn pasted scripture text into a single narrated audio file
#[derive(Parser, Debug)]
#[command(name = "narration-studio", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to settings.toml (default: platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Studio backend URL, overrides the config file
    #[arg(long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// More log output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Narrate a text file: parse, generate every paragraph, merge, treat, save
    Narrate {
        /// Text file to narrate (`-` for stdin)
        file: PathBuf,

        /// Title used for the output filename
        #[arg(long, short)]
        title: Option<String>,

        /// Directory to write the narration into
        #[arg(long, short, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Extra pool runs for paragraphs that failed
        #[arg(long, default_value_t = 1)]
        retries: u32,

        /// Voice model family
        #[arg(long, value_enum)]
        model_type: Option<ModelTypeArg>,

        /// Model size (0.6B or 1.7B)
        #[arg(long)]
        model_size: Option<String>,

        /// Built-in speaker (CustomVoice)
        #[arg(long)]
        speaker: Option<String>,

        /// Voice description (VoiceDesign)
        #[arg(long, value_name = "PROMPT")]
        voice_prompt: Option<String>,

        /// Saved voice profile id (Base)
        #[arg(long, value_name = "ID")]
        profile: Option<String>,

        /// Parallel generation calls
        #[arg(long, short = 'j')]
        concurrency: Option<usize>,
    },

    /// Manage saved voice profiles
    Profiles {
        #[command(subcommand)]
        action: ProfilesAction,
    },

    /// Backend self-update
    Update {
        #[command(subcommand)]
        action: UpdateAction,
    },

    /// Follow the backend's model download status until it settles
    Status,

    /// Write a default settings.toml
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfilesAction {
    /// List profiles; the active one is marked
    List,

    /// Upload a new profile from reference audio and its transcript, and
    /// make it the active one
    Create {
        #[arg(long)]
        name: String,

        /// Exact transcript of the reference audio
        #[arg(long, value_name = "TEXT")]
        text: String,

        /// Reference audio file
        #[arg(long, value_name = "PATH")]
        audio: PathBuf,
    },

    /// Delete a user profile
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum UpdateAction {
    /// Ask the backend whether an update is available
    Check,

    /// Install the available update and wait for the backend to restart
    Apply {
        /// Install from this URL instead of the one the check reports
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelTypeArg {
    CustomVoice,
    VoiceDesign,
    Base,
}

impl From<ModelTypeArg> for ModelType {
    fn from(arg: ModelTypeArg) -> Self {
        match arg {
            ModelTypeArg::CustomVoice => ModelType::CustomVoice,
            ModelTypeArg::VoiceDesign => ModelType::VoiceDesign,
            ModelTypeArg::Base => ModelType::Base,
        }
    }
}

impl Cli {
    /// Log filter implied by `-v`.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Apply global overrides to a loaded config.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(server) = &self.server {
            config.server.base_url = server.clone();
        }
    }
}

/// Voice and pool overrides from `narrate`.
#[derive(Debug, Default, Clone)]
pub struct NarrateOverrides {
    pub output_dir: Option<PathBuf>,
    pub model_type: Option<ModelTypeArg>,
    pub model_size: Option<String>,
    pub speaker: Option<String>,
    pub voice_prompt: Option<String>,
    pub profile: Option<String>,
    pub concurrency: Option<usize>,
}

impl NarrateOverrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.output_dir {
            config.export.output_dir = dir.clone();
        }
        if let Some(model_type) = self.model_type {
            config.voice.model_type = model_type.into();
        }
        if let Some(size) = &self.model_size {
            config.voice.model_size = size.clone();
        }
        if let Some(speaker) = &self.speaker {
            config.voice.speaker = speaker.clone();
        }
        if let Some(prompt) = &self.voice_prompt {
            config.voice.voice_design_prompt = Some(prompt.clone());
        }
        if let Some(profile) = &self.profile {
            config.voice.profile_id = Some(profile.clone());
        }
        if let Some(k) = self.concurrency {
            config.pool.concurrency = k;
        }
    }
}
