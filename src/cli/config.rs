//! Inspect and reset the launcher configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::common::CommandContext;
use crate::config::LauncherConfig;

/// Manage the launcher configuration file.
///
/// # Examples
///
/// ```bash
/// hyprism config            # same as `config show`
/// hyprism config path
/// hyprism config reset
/// ```
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file location
    Path,
    /// Overwrite the configuration file with defaults
    Reset,
}

impl ConfigCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        match self.command {
            Some(ConfigSubcommands::Show) | None => Self::show(ctx),
            Some(ConfigSubcommands::Path) => {
                println!("{}", ctx.config_path.display());
                Ok(())
            }
            Some(ConfigSubcommands::Reset) => Self::reset(ctx).await,
        }
    }

    fn show(ctx: &CommandContext) -> Result<()> {
        println!("{}", "Launcher Configuration".bold());
        let origin = if ctx.config_path.exists() {
            String::new()
        } else {
            " (not created yet, showing defaults)".dimmed().to_string()
        };
        println!("Location: {}{}\n", ctx.config_path.display(), origin);
        println!("{}", toml::to_string_pretty(&ctx.config)?);
        Ok(())
    }

    async fn reset(ctx: &CommandContext) -> Result<()> {
        LauncherConfig::default().save_to(&ctx.config_path).await?;
        println!("{} Reset configuration at {}", "✓".green(), ctx.config_path.display());
        Ok(())
    }
}
