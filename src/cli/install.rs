//! Install or update the game from a patch artifact.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::CommandContext;
use crate::core::ProgressUpdate;
use crate::download::Asset;
use crate::install::{ApplyOutcome, GameInstaller, PatchApplier, PatchTool};

/// Download a patch, verify it and apply it to the game directory.
///
/// # Examples
///
/// ```bash
/// hyprism install --url https://cdn.example.com/4.pwr --sha256 9f86d0...
/// hyprism install --url https://cdn.example.com/4.pwr --version 4 --patch-tool ./butler
/// ```
#[derive(Args, Debug)]
pub struct InstallCommand {
    /// Location of the patch artifact
    #[arg(long)]
    url: String,

    /// Expected SHA-256 of the artifact; verification is skipped without it
    #[arg(long)]
    sha256: Option<String>,

    /// Expected size in bytes, used for progress when the server omits it
    #[arg(long)]
    size: Option<u64>,

    /// Game version directory to install into (defaults to the configured one)
    #[arg(long)]
    version: Option<String>,

    /// Patch tool to use instead of the bundled one or the one on PATH
    #[arg(long, value_name = "PATH")]
    patch_tool: Option<PathBuf>,
}

impl InstallCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let explicit_tool =
            self.patch_tool.as_deref().or(ctx.config.updates.patch_tool_path.as_deref());
        let tool = PatchTool::locate(explicit_tool, &ctx.layout)?;

        let target = match &self.version {
            Some(version) => ctx.layout.game_dir(version),
            None => ctx.config.game_dir(&ctx.layout),
        };

        let mut asset = Asset::new(&self.url);
        if let Some(sha256) = self.sha256 {
            asset = asset.with_checksum(sha256);
        }
        if let Some(size) = self.size {
            asset = asset.with_size(size);
        }

        ctx.layout.create_folders()?;
        let installer = GameInstaller::new(ctx.downloader()?, PatchApplier::new(tool));

        let renderer = ctx.progress();
        let sink = |update: &ProgressUpdate| renderer.update(update);
        let outcome = installer.install(&asset, &target, Some(&sink), &ctx.cancel).await;
        renderer.finish();
        let outcome = outcome?;
        installer.applier().wait_for_cleanup().await;

        match outcome {
            ApplyOutcome::AlreadyInstalled => {
                println!("{} Game already installed at {}", "✓".green(), target.display());
            }
            ApplyOutcome::Applied => {
                println!("{} Game installed at {}", "✓".green(), target.display());
            }
        }
        Ok(())
    }
}
