//! Print where HyPrism keeps its files.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::CommandContext;
use crate::upgrade::HelperBinary;
use crate::utils::platform::PlatformProfile;

#[derive(Args, Debug)]
pub struct PathsCommand {}

impl PathsCommand {
    pub fn execute(self, ctx: &CommandContext) -> Result<()> {
        let layout = &ctx.layout;
        let rows = [
            ("Application", layout.root().to_path_buf()),
            ("Configuration", ctx.config_path.clone()),
            ("Game", ctx.config.game_dir(layout)),
            ("Patch tool", layout.butler_dir()),
            ("Runtime", layout.jre_dir()),
            ("Cache", layout.cache_dir()),
            ("Logs", layout.logs_dir()),
            ("User data", layout.user_data_dir()),
        ];
        for (label, path) in rows {
            println!("{:<14} {}", format!("{label}:").bold(), path.display());
        }

        let helper = HelperBinary::next_to_current_exe(&PlatformProfile::current())?;
        let state = if helper.present {
            "present".green()
        } else {
            "missing".yellow()
        };
        println!("{:<14} {} ({})", "Helper:".bold(), helper.path.display(), state);
        Ok(())
    }
}
