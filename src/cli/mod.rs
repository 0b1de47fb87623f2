//! Command-line interface for HyPrism.
//!
//! The launcher UI drives the same library operations; the CLI exposes them for
//! scripting, troubleshooting and headless machines.
//!
//! # Available Commands
//!
//! ## Game
//! - `install` - Download a patch, verify it and apply it to the game directory
//! - `news` - Show the latest game news
//!
//! ## Launcher
//! - `ensure-helper` - Make sure the self-update helper is installed
//! - `self-update` - Replace the running launcher with a newer build
//!
//! ## Inspection
//! - `paths` - Show where files are kept
//! - `config` - Show, locate or reset the configuration file
//!
//! # Global Options
//!
//! | Flag | Effect |
//! |------|--------|
//! | `--verbose` / `-v` | Log at debug level |
//! | `--quiet` / `-q` | Only log warnings and errors |
//! | `--no-progress` | Disable progress bars (also `HYPRISM_NO_PROGRESS`) |
//! | `--config` / `-c` | Use a different configuration file (also `HYPRISM_CONFIG`) |
//!
//! `RUST_LOG` overrides the verbosity flags. Pressing Ctrl-C cancels the running
//! download or patch cleanly.

mod common;
mod config;
mod install;
mod news;
mod paths;
mod upgrade;

pub use common::CommandContext;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI application structure for HyPrism
#[derive(Parser, Debug)]
#[command(
    name = "hyprism",
    about = "HyPrism - install the game and keep the launcher up to date",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable progress bars and spinners
    #[arg(long, global = true)]
    no_progress: bool,

    /// Path to an alternative configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download, verify and apply a game patch
    Install(install::InstallCommand),

    /// Make sure the self-update helper is installed
    EnsureHelper(upgrade::EnsureHelperCommand),

    /// Replace the running launcher with a newer build
    SelfUpdate(upgrade::SelfUpdateCommand),

    /// Show where HyPrism keeps its files
    Paths(paths::PathsCommand),

    /// Show, locate or reset the configuration file
    Config(config::ConfigCommand),

    /// Show the latest game news
    News(news::NewsCommand),
}

impl Cli {
    /// Default log filter for the selected verbosity.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    #[must_use]
    pub fn show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }

    #[must_use]
    pub fn config_override(&self) -> Option<&std::path::Path> {
        self.config.as_deref()
    }

    /// Runs the selected command.
    pub async fn execute(self) -> Result<()> {
        let ctx = CommandContext::load(self.config.as_deref(), self.show_progress()).await?;
        self.execute_with_context(ctx).await
    }

    /// Runs the selected command against a prepared context.
    pub async fn execute_with_context(self, ctx: CommandContext) -> Result<()> {
        ctx.cancel_on_ctrl_c();

        match self.command {
            Commands::Install(cmd) => cmd.execute(&ctx).await,
            Commands::EnsureHelper(cmd) => cmd.execute(&ctx).await,
            Commands::SelfUpdate(cmd) => cmd.execute(&ctx).await,
            Commands::Paths(cmd) => cmd.execute(&ctx),
            Commands::Config(cmd) => cmd.execute(&ctx).await,
            Commands::News(cmd) => cmd.execute().await,
        }
    }
}
