//! Provisioning of the self-update helper.
//!
//! The helper lives next to the launcher executable as `update-helper`
//! (`update-helper.exe` on Windows). An existing file is always trusted and never
//! re-verified, so a manually placed helper is not clobbered. A missing one is
//! downloaded from the release source, and here a checksum is mandatory: the helper
//! is executed with the user's privileges.
//!
//! Concurrent provisioning is not locked. Two callers may both download, but each
//! copy is verified against the same digest and moved into place atomically, so
//! the result is the same file either way.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::{LauncherError, ProgressCallback};
use crate::download::{ChecksumVerifier, Downloader};
use crate::upgrade::release::{AssetKind, ReleaseSource};
use crate::utils::fs::{FileGuard, copy_file, set_executable_best_effort};
use crate::utils::platform::{PlatformProfile, current_exe};

/// Where the helper is expected and whether it is there right now.
///
/// Re-resolved on every request so a helper deleted behind our back is noticed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperBinary {
    pub path: PathBuf,
    pub present: bool,
}

impl HelperBinary {
    /// Stats the helper location inside `dir`.
    #[must_use]
    pub fn resolve(dir: &Path, profile: &PlatformProfile) -> Self {
        let path = dir.join(profile.helper_file_name());
        let present = path.is_file();
        Self {
            path,
            present,
        }
    }

    /// Stats the helper location next to the running executable.
    pub fn next_to_current_exe(profile: &PlatformProfile) -> Result<Self> {
        let exe = current_exe()?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::resolve(dir, profile))
    }
}

/// Ensures the update helper is installed.
pub struct HelperProvisioner<S> {
    source: S,
    downloader: Downloader,
    install_dir: Option<PathBuf>,
    profile: PlatformProfile,
}

impl<S: ReleaseSource> HelperProvisioner<S> {
    /// Provisioner installing next to the running executable.
    pub fn new(source: S, downloader: Downloader) -> Self {
        Self {
            source,
            downloader,
            install_dir: None,
            profile: PlatformProfile::current(),
        }
    }

    /// Installs into `dir` instead of the executable's directory.
    #[must_use]
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: PlatformProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Current state of the helper location.
    pub fn locate(&self) -> Result<HelperBinary> {
        match &self.install_dir {
            Some(dir) => Ok(HelperBinary::resolve(dir, &self.profile)),
            None => HelperBinary::next_to_current_exe(&self.profile),
        }
    }

    /// Returns the helper path, downloading the helper first if it is missing.
    pub async fn ensure_helper(&self, cancel: &CancellationToken) -> Result<PathBuf> {
        self.ensure_helper_with_progress(None, cancel).await
    }

    /// [`ensure_helper`](Self::ensure_helper) with download progress reporting.
    ///
    /// # Errors
    ///
    /// - [`LauncherError::ChecksumRequired`] if the release has no digest for the
    ///   helper; nothing is downloaded or written
    /// - [`LauncherError::ChecksumMismatch`] if the download does not match; no
    ///   helper is left behind
    /// - download and filesystem errors as-is
    pub async fn ensure_helper_with_progress(
        &self,
        on_progress: Option<&ProgressCallback<'_>>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let helper = self.locate()?;
        if helper.present {
            debug!("Update helper present at {}", helper.path.display());
            return Ok(helper.path);
        }

        info!("Update helper not found at {}, downloading", helper.path.display());

        let asset = self.source.get_asset(AssetKind::UpdateHelper).await?;
        let Some(expected) = asset.sha256() else {
            return Err(LauncherError::ChecksumRequired {
                asset: asset.url.clone(),
            }
            .into());
        };

        let download = FileGuard::new(self.downloader.fetch(&asset, on_progress, cancel).await?);
        ChecksumVerifier::verify(download.path(), Some(expected)).await?;

        copy_file(download.path(), &helper.path).await?;
        if self.profile.needs_exec_bit {
            set_executable_best_effort(&helper.path);
        }

        info!("Installed update helper at {}", helper.path.display());
        Ok(helper.path)
    }
}
