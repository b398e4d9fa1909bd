//! Application entry point for Narration Studio.
//!
//! # Startup sequence
//!
//! 1. Parse the command line.
//! 2. Initialise logging (`-v` raises the default filter, `RUST_LOG` wins).
//! 3. Load [`AppConfig`] (defaults on first run) and apply CLI overrides.
//! 4. Build the HTTP client and dispatch to the subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

use narration_studio::{
    activity::ActivityLog,
    cli::{Cli, Commands, NarrateOverrides, ProfilesAction, UpdateAction},
    client::{HttpStudioClient, ReferenceAudio},
    config::{AppConfig, AppPaths},
    profiles::ProfileManager,
    readiness::ReadinessGate,
    registry::{lock_registry, ParagraphStatus},
    studio::{Studio, StudioCommand, StudioEvent},
    updater::Updater,
};

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    // 2. Configuration
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| AppPaths::new().settings_file);
    let mut config = AppConfig::load_from(&config_path).unwrap_or_else(|e| {
        log::warn!("Failed to load config from {} ({e}); using defaults", config_path.display());
        AppConfig::default()
    });
    cli.apply_overrides(&mut config);
    log::debug!("backend: {}", config.server.base_url);

    let activity = ActivityLog::new();

    match cli.command {
        Commands::Narrate {
            file,
            title,
            output_dir,
            retries,
            model_type,
            model_size,
            speaker,
            voice_prompt,
            profile,
            concurrency,
        } => {
            NarrateOverrides {
                output_dir,
                model_type,
                model_size,
                speaker,
                voice_prompt,
                profile,
                concurrency,
            }
            .apply(&mut config);
            run_narrate(config, activity, &file, title.unwrap_or_default(), retries).await
        }
        Commands::Profiles { action } => run_profiles(config, &config_path, activity, action).await,
        Commands::Update { action } => run_update(&config, activity, action).await,
        Commands::Status => run_status(&config).await,
        Commands::InitConfig { force } => run_init_config(&config_path, force),
    }
}

// ---------------------------------------------------------------------------
// narrate
// ---------------------------------------------------------------------------

async fn run_narrate(
    mut config: AppConfig,
    activity: ActivityLog,
    file: &Path,
    title: String,
    retries: u32,
) -> Result<()> {
    let raw = read_input(file).await?;
    if raw.trim().is_empty() {
        bail!("{} contains no text", file.display());
    }

    let profiles = ProfileManager::new(
        Arc::new(HttpStudioClient::from_config(&config.server)),
        activity.clone(),
    );
    profiles
        .select_for(&mut config.voice)
        .await
        .context("failed to load voice profiles")?;

    let (studio, mut events) = Studio::from_config(&config, activity);
    let registry = studio.registry();
    let (tx, rx) = mpsc::channel::<StudioCommand>(16);
    let studio_task = tokio::spawn(studio.run(rx));

    tx.send(StudioCommand::Parse(raw)).await?;

    let mut retries_left = retries;
    let mut exported: Option<PathBuf> = None;

    while let Some(event) = events.recv().await {
        match event {
            StudioEvent::Parsed { count } => println!("{count} paragraph(s)"),
            StudioEvent::ParagraphChanged { id, status } => {
                log::debug!("{id}: {}", status.label());
            }
            StudioEvent::PoolFinished(summary) => {
                log::debug!("pool finished: {summary:?}");
                if lock_registry(&registry).is_export_ready() {
                    tx.send(StudioCommand::ExportAll {
                        title: title.clone(),
                    })
                    .await?;
                } else if retries_left > 0 {
                    retries_left -= 1;
                    log::warn!("{} paragraph(s) failed; retrying", summary.failed);
                    tx.send(StudioCommand::GenerateAll).await?;
                } else {
                    report_failures(&registry);
                    break;
                }
            }
            StudioEvent::Exported { path, treated } => {
                if !treated {
                    println!("note: treatment failed, saved untreated audio");
                }
                println!("{}", path.display());
                exported = Some(path);
                break;
            }
            StudioEvent::Notice(message) => {
                eprintln!("{message}");
                break;
            }
            StudioEvent::PoolStarted | StudioEvent::ExportReady(_) => {}
        }
    }

    drop(tx);
    studio_task.await?;

    match exported {
        Some(_) => Ok(()),
        None => bail!("narration was not exported"),
    }
}

async fn read_input(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        return Ok(text);
    }
    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))
}

fn report_failures(registry: &narration_studio::registry::SharedRegistry) {
    let registry = lock_registry(registry);
    for para in registry.paragraphs() {
        if para.status() != ParagraphStatus::Done {
            eprintln!(
                "para {} {} ({}): {}",
                para.index() + 1,
                para.status().label(),
                para.status().action_label(),
                para.text()
            );
        }
    }
}

// ---------------------------------------------------------------------------
// profiles
// ---------------------------------------------------------------------------

async fn run_profiles(
    mut config: AppConfig,
    config_path: &Path,
    activity: ActivityLog,
    action: ProfilesAction,
) -> Result<()> {
    let client = Arc::new(HttpStudioClient::from_config(&config.server));
    let manager = ProfileManager::new(client, activity);

    match action {
        ProfilesAction::List => {
            let listing = manager.refresh(config.voice.profile_id.as_deref()).await?;
            if listing.profiles.is_empty() {
                println!("no voice profiles");
            }
            for profile in &listing.profiles {
                let marker = if listing.selected.as_deref() == Some(profile.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {:<24} {}", profile.id, profile.display_name());
            }
        }
        ProfilesAction::Create { name, text, audio } => {
            let bytes = tokio::fs::read(&audio)
                .await
                .with_context(|| format!("failed to read {}", audio.display()))?;
            let file_name = audio
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "reference.wav".to_string());

            let id = manager
                .create(&name, &text, ReferenceAudio { file_name, bytes })
                .await?;
            config.voice.profile_id = Some(id.clone());
            config.save_to(config_path)?;
            println!("{id}");
        }
        ProfilesAction::Delete { id } => {
            manager.delete(&id).await?;
            if config.voice.profile_id.as_deref() == Some(id.as_str()) {
                config.voice.profile_id = None;
                config.save_to(config_path)?;
            }
            println!("deleted {id}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// update
// ---------------------------------------------------------------------------

async fn run_update(config: &AppConfig, activity: ActivityLog, action: UpdateAction) -> Result<()> {
    let client = Arc::new(HttpStudioClient::from_config(&config.server));
    let updater = Updater::new(client, activity, config.update.clone());

    match action {
        UpdateAction::Check => match updater.check().await? {
            Some(info) => println!(
                "update available: {}",
                info.latest_version.as_deref().unwrap_or("unknown version")
            ),
            None => println!("up to date"),
        },
        UpdateAction::Apply { url } => {
            let url = match url {
                Some(url) => url,
                None => match updater.check().await? {
                    Some(info) => info.offered_url().unwrap_or_default().to_string(),
                    None => {
                        println!("up to date");
                        return Ok(());
                    }
                },
            };
            let polls = updater.apply(&url).await?;
            println!("backend restarted after {polls} check(s)");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

async fn run_status(config: &AppConfig) -> Result<()> {
    let client = HttpStudioClient::from_config(&config.server);
    let gate = ReadinessGate::new();
    let mut updates = gate.subscribe();

    let printer = tokio::spawn(async move {
        let mut last = String::new();
        while updates.changed().await.is_ok() {
            let label = updates.borrow_and_update().status.label();
            if label != last {
                println!("{label}");
                last = label;
            }
        }
    });

    let state = gate.follow(&client).await;
    drop(gate);
    printer.await?;

    if !state.status.is_terminal() {
        bail!("progress stream closed before the model settled ({})", state.status.label());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// init-config
// ---------------------------------------------------------------------------

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AppConfig::default().save_to(path)?;
    println!("{}", path.display());
    Ok(())
}
