//! Game installation from patch artifacts
//!
//! - [`staging`] - scratch directory owned by a single apply
//! - [`applier`] - the patch application state machine and patch tool discovery
//!
//! [`GameInstaller`] chains the pieces the way the `install` command uses them:
//! download the artifact, verify it when a checksum is known, then apply it.
//!
//! Game patch checksums are optional. When the release source publishes none the
//! artifact is applied unverified and a warning is logged; only the update helper
//! insists on a digest.

pub mod applier;
pub mod staging;

pub use applier::{ApplyOutcome, PatchApplier, PatchTool};
pub use staging::{StagingContext, StagingManager};

use anyhow::Result;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::core::{InstallStage, ProgressCallback, ProgressUpdate};
use crate::download::{Asset, Downloader};
use crate::process::CommandRunner;
use crate::utils::fs::FileGuard;

/// Downloads, verifies and applies one game patch.
pub struct GameInstaller<R> {
    downloader: Downloader,
    applier: PatchApplier<R>,
}

impl<R: CommandRunner> GameInstaller<R> {
    pub const fn new(downloader: Downloader, applier: PatchApplier<R>) -> Self {
        Self {
            downloader,
            applier,
        }
    }

    #[must_use]
    pub const fn applier(&self) -> &PatchApplier<R> {
        &self.applier
    }

    /// Installs `asset` into `target_dir`.
    ///
    /// Nothing is downloaded when the target is already installed or the patch
    /// tool is missing. A downloaded
    /// artifact is removed if verification or application fails.
    pub async fn install(
        &self,
        asset: &Asset,
        target_dir: &Path,
        on_progress: Option<&ProgressCallback<'_>>,
        cancel: &CancellationToken,
    ) -> Result<ApplyOutcome> {
        if self.applier.is_installed(target_dir) {
            tracing::info!("{} is already installed, skipping download", target_dir.display());
            if let Some(callback) = on_progress {
                callback(&ProgressUpdate::stage(InstallStage::Complete, 100.0, "Game already installed"));
            }
            return Ok(ApplyOutcome::AlreadyInstalled);
        }

        self.applier.tool().ensure_present()?;

        if asset.checksum().is_none() {
            tracing::warn!(
                "No checksum published for {}; the patch will be applied unverified",
                asset.url
            );
        }

        let patch_file = self.downloader.fetch_verified(asset, on_progress, cancel).await?;
        let guard = FileGuard::new(patch_file);

        let outcome = self.applier.apply(guard.path(), target_dir, on_progress, cancel).await?;
        // The applier schedules its own deferred deletion on success.
        guard.keep();
        Ok(outcome)
    }
}
