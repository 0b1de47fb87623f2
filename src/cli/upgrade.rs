//! Self-update commands.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::CommandContext;
use crate::core::ProgressUpdate;
use crate::download::Asset;
use crate::upgrade::{
    AssetKind, HelperProvisioner, ReleaseSource, SelfUpdateOrchestrator, StaticReleaseSource,
    stage_replacement,
};

/// Make sure the update helper sits next to the launcher.
#[derive(Args, Debug)]
pub struct EnsureHelperCommand {}

impl EnsureHelperCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let provisioner = HelperProvisioner::new(ctx.release_source()?, ctx.downloader()?);

        let renderer = ctx.progress();
        let sink = |update: &ProgressUpdate| renderer.update(update);
        let helper = provisioner.ensure_helper_with_progress(Some(&sink), &ctx.cancel).await;
        renderer.finish();

        println!("{} Update helper ready at {}", "✓".green(), helper?.display());
        Ok(())
    }
}

/// Replace the running launcher with a newer build.
///
/// Without `--url` the latest release is used, and nothing happens when it is not
/// newer than the running version (unless `--force`). With `--url` the given build
/// is installed as-is; its checksum is mandatory.
///
/// # Examples
///
/// ```bash
/// hyprism self-update --check
/// hyprism self-update
/// hyprism self-update --url https://example.com/hyprism-linux-x86_64 --sha256 2c26b4...
/// ```
#[derive(Args, Debug)]
pub struct SelfUpdateCommand {
    /// Replacement launcher to install instead of the latest release
    #[arg(long, requires = "sha256")]
    url: Option<String>,

    /// SHA-256 of the replacement launcher
    #[arg(long, requires = "url")]
    sha256: Option<String>,

    /// Only report whether an update is available
    #[arg(long, conflicts_with = "url")]
    check: bool,

    /// Reinstall even when already on the latest version
    #[arg(long)]
    force: bool,
}

impl SelfUpdateCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let current = env!("CARGO_PKG_VERSION");
        let releases = ctx.release_source()?;

        if let (Some(url), Some(sha256)) = (&self.url, &self.sha256) {
            let source = StaticReleaseSource::new()
                .with_asset(AssetKind::Launcher, Asset::new(url).with_checksum(sha256));
            return Self::update_from(ctx, &source).await;
        }

        let latest = releases.latest_release().await?;
        let newer = latest.is_newer_than(current);
        if self.check {
            if newer {
                println!("{} Update available: {} → {}", "↑".yellow(), current, latest.version.green());
                println!("Run `hyprism self-update` to install it");
            } else {
                println!("{} HyPrism {} is up to date", "✓".green(), current);
            }
            return Ok(());
        }
        if !newer && !self.force {
            println!("{} HyPrism {} is up to date", "✓".green(), current);
            return Ok(());
        }

        println!("Updating HyPrism {} → {}", current, latest.version.cyan());
        Self::update_from(ctx, &releases).await
    }

    async fn update_from<S: ReleaseSource>(ctx: &CommandContext, launcher_source: &S) -> Result<()> {
        let downloader = ctx.downloader()?;
        let renderer = ctx.progress();
        let sink = |update: &ProgressUpdate| renderer.update(update);

        let provisioner = HelperProvisioner::new(ctx.release_source()?, downloader.clone());
        let helper = provisioner.ensure_helper_with_progress(Some(&sink), &ctx.cancel).await;
        let staged = match helper {
            Ok(_) => stage_replacement(launcher_source, &downloader, Some(&sink), &ctx.cancel).await,
            Err(e) => Err(e),
        };
        renderer.finish();
        let staged = staged?;

        println!("{} Restarting to finish the update", "↻".cyan());
        match SelfUpdateOrchestrator::new().apply(&staged)? {}
    }
}
