//! State shared by every command.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::LauncherConfig;
use crate::download::Downloader;
use crate::upgrade::GitHubReleaseSource;
use crate::utils::platform::AppLayout;
use crate::utils::progress::ProgressRenderer;

/// Resolved layout, configuration and cancellation for one invocation.
pub struct CommandContext {
    pub layout: AppLayout,
    pub config_path: PathBuf,
    pub config: LauncherConfig,
    pub cancel: CancellationToken,
    pub show_progress: bool,
}

impl CommandContext {
    /// Detects the layout and loads the configuration.
    pub async fn load(config_override: Option<&Path>, show_progress: bool) -> Result<Self> {
        let layout = AppLayout::detect()?;
        Self::with_layout(layout, config_override, show_progress).await
    }

    /// Loads the configuration for an explicit layout.
    pub async fn with_layout(
        layout: AppLayout,
        config_override: Option<&Path>,
        show_progress: bool,
    ) -> Result<Self> {
        let config_path = LauncherConfig::resolve_path(config_override, &layout);
        let config = LauncherConfig::load_from(&config_path).await?;
        debug!("Using configuration {}", config_path.display());

        Ok(Self {
            layout,
            config_path,
            config,
            cancel: CancellationToken::new(),
            show_progress,
        })
    }

    /// Downloader writing into the layout's cache directory.
    pub fn downloader(&self) -> Result<Downloader> {
        Downloader::new(self.layout.cache_dir())
    }

    /// Release source configured in `[updates]`.
    pub fn release_source(&self) -> Result<GitHubReleaseSource> {
        let updates = &self.config.updates;
        GitHubReleaseSource::new(&updates.release_owner, &updates.release_repo)
    }

    #[must_use]
    pub fn progress(&self) -> ProgressRenderer {
        ProgressRenderer::new(self.show_progress)
    }

    /// Cancels this context's token when Ctrl-C is pressed.
    pub fn cancel_on_ctrl_c(&self) {
        let token = self.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Interrupted, cancelling");
                    token.cancel();
                }
                Err(e) => debug!("Ctrl-C handler unavailable: {e}"),
            }
        });
    }
}
