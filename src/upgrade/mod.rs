//! Self-update functionality for HyPrism.
//!
//! The launcher cannot overwrite its own running executable reliably, so updates
//! are handed to a small companion program, the update helper.
//!
//! # Architecture Overview
//!
//! - **[`release`]**: resolves helper and launcher assets from release metadata
//! - **[`helper`]**: makes sure the helper exists next to the executable,
//!   downloading and verifying it on first use
//! - **[`orchestrator`]**: starts the helper and exits so it can swap the binary
//!
//! ## Update Process Flow
//!
//! ```text
//! 1. Provision helper
//!    ├── Use the existing helper if present
//!    └── Otherwise download it (checksum mandatory) and install it
//!
//! 2. Stage replacement
//!    ├── Resolve the launcher asset for this platform
//!    ├── Download it into the cache directory
//!    └── Verify it (checksum mandatory)
//!
//! 3. Hand off
//!    ├── Launch the helper detached: <helper> <current exe> <staged file>
//!    └── Exit with status 0
//! ```
//!
//! # Security Considerations
//!
//! Both the helper and the replacement launcher end up being executed, so neither
//! is accepted without a published SHA-256 digest. Game patches, by contrast, are
//! verified only when a digest is available.

pub mod helper;
pub mod orchestrator;
pub mod release;

pub use helper::{HelperBinary, HelperProvisioner};
pub use orchestrator::{Handoff, SelfUpdateOrchestrator};
pub use release::{AssetKind, GitHubReleaseSource, ReleaseInfo, ReleaseSource, StaticReleaseSource};

use anyhow::Result;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::{LauncherError, ProgressCallback};
use crate::download::Downloader;
use crate::utils::fs::{FileGuard, set_executable};
use crate::utils::platform::PlatformProfile;

/// Downloads and verifies a replacement launcher, ready for the helper.
///
/// # Errors
///
/// [`LauncherError::ChecksumRequired`] when the release publishes no digest for the
/// launcher asset; nothing is downloaded in that case.
pub async fn stage_replacement<S: ReleaseSource>(
    source: &S,
    downloader: &Downloader,
    on_progress: Option<&ProgressCallback<'_>>,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    let asset = source.get_asset(AssetKind::Launcher).await?;
    if asset.sha256().is_none() {
        return Err(LauncherError::ChecksumRequired {
            asset: asset.url.clone(),
        }
        .into());
    }

    let staged = FileGuard::new(downloader.fetch_verified(&asset, on_progress, cancel).await?);
    if PlatformProfile::current().needs_exec_bit {
        set_executable(staged.path())?;
    }

    info!("Staged launcher update at {}", staged.path().display());
    Ok(staged.keep())
}
