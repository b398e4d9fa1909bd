//! Backend self-update: check for a release, ask the backend to install it,
//! then wait for the restarted server to answer again.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::activity::ActivityLog;
use crate::client::{ApiError, UpdateInfo, UpdateService};
use crate::config::UpdateConfig;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("failed to check for updates: {0}")]
    Check(#[source] ApiError),

    #[error("no download URL for the update")]
    NoDownloadUrl,

    #[error("server did not come back after {polls} attempt(s)")]
    ServerDidNotReturn { polls: u32 },
}

pub struct Updater {
    service: Arc<dyn UpdateService>,
    activity: ActivityLog,
    config: UpdateConfig,
}

impl Updater {
    pub fn new(service: Arc<dyn UpdateService>, activity: ActivityLog, config: UpdateConfig) -> Self {
        Self {
            service,
            activity,
            config,
        }
    }

    /// `Some` only when an update with a download URL is on offer.
    pub async fn check(&self) -> Result<Option<UpdateInfo>, UpdateError> {
        let info = self.service.check_update().await.map_err(|e| {
            log::error!("failed to check for updates: {e}");
            UpdateError::Check(e)
        })?;

        if info.offered_url().is_none() {
            log::info!("no update available");
            return Ok(None);
        }
        let version = info.latest_version.as_deref().unwrap_or("unknown");
        self.activity.info(format!("Update available: {version}"));
        Ok(Some(info))
    }

    /// Ask the backend to install from `download_url`, then probe until it
    /// answers.  A failed install request is expected (the server shuts
    /// down to replace itself) and does not stop the wait.  Returns the
    /// number of probes it took.
    pub async fn apply(&self, download_url: &str) -> Result<u32, UpdateError> {
        if download_url.trim().is_empty() {
            return Err(UpdateError::NoDownloadUrl);
        }

        self.activity
            .info("Downloading and installing update. The app will restart shortly...");
        if let Err(e) = self.service.apply_update(download_url).await {
            log::warn!("update request failed (likely server disconnected), waiting for restart: {e}");
        }

        self.wait_for_server().await
    }

    async fn wait_for_server(&self) -> Result<u32, UpdateError> {
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        let polls = self.config.max_polls.max(1);

        for attempt in 1..=polls {
            tokio::time::sleep(interval).await;
            match self.service.probe().await {
                Ok(()) => {
                    self.activity.ok("Update installed. Server is back.");
                    return Ok(attempt);
                }
                Err(e) => log::debug!("server not back yet ({attempt}/{polls}): {e}"),
            }
        }

        self.activity.error("Server did not come back after the update.");
        Err(UpdateError::ServerDidNotReturn { polls })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
