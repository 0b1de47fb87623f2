//! Hand-off of a self-update to the update helper.
//!
//! A running executable cannot reliably overwrite itself on every platform, so the
//! launcher starts the helper with two arguments (its own path and the staged
//! replacement) and exits with status 0. From then on the helper owns the swap:
//! it waits for this process to go away, replaces the file and relaunches it.
//!
//! ```text
//! LocateSelf ──► LocateHelper ──► LaunchHelper ──► Terminate
//!                     │                 │
//!                HelperMissing   HelperLaunchError   (process keeps running)
//! ```
//!
//! The orchestrator does not provision the helper. Call
//! [`HelperProvisioner::ensure_helper`](super::helper::HelperProvisioner::ensure_helper)
//! first.

use anyhow::Result;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::LauncherError;
use crate::process::{CommandRunner, ProcessCommand, SystemCommandRunner};
use crate::upgrade::helper::HelperBinary;
use crate::utils::fs::set_executable_best_effort;
use crate::utils::platform::{PlatformProfile, current_exe};

/// A helper that was started successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub helper: PathBuf,
    pub pid: u32,
}

/// Replaces the running launcher through the update helper.
pub struct SelfUpdateOrchestrator<R = SystemCommandRunner> {
    runner: R,
    profile: PlatformProfile,
    executable: Option<PathBuf>,
}

impl SelfUpdateOrchestrator<SystemCommandRunner> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_runner(SystemCommandRunner::new())
    }
}

impl Default for SelfUpdateOrchestrator<SystemCommandRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> SelfUpdateOrchestrator<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            profile: PlatformProfile::current(),
            executable: None,
        }
    }

    /// Pretends the running executable lives at `path`.
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: PlatformProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Starts the helper and exits the process with status 0.
    ///
    /// Only returns on failure, in which case the running launcher is untouched.
    pub fn apply(&self, staged_replacement: &Path) -> Result<Infallible> {
        let handoff = self.launch_helper(staged_replacement)?;
        info!("Update helper started (pid {}), exiting for replacement", handoff.pid);
        std::process::exit(0)
    }

    /// Every step of [`apply`](Self::apply) except the final exit.
    ///
    /// # Errors
    ///
    /// - [`LauncherError::HelperMissing`] if no helper sits next to the executable
    /// - [`LauncherError::FileSystemError`] if the staged replacement is missing
    /// - [`LauncherError::HelperLaunchError`] if the helper cannot be started
    pub fn launch_helper(&self, staged_replacement: &Path) -> Result<Handoff> {
        // LocateSelf
        let executable = match &self.executable {
            Some(path) => path.clone(),
            None => current_exe()?,
        };
        let exe_dir = executable.parent().unwrap_or_else(|| Path::new("."));

        // LocateHelper
        let helper = HelperBinary::resolve(exe_dir, &self.profile);
        if !helper.present {
            return Err(LauncherError::HelperMissing {
                path: helper.path.display().to_string(),
            }
            .into());
        }
        if !staged_replacement.is_file() {
            return Err(LauncherError::FileSystemError {
                operation: "locating staged replacement".to_string(),
                path: staged_replacement.display().to_string(),
                reason: "file does not exist".to_string(),
            }
            .into());
        }

        if self.profile.needs_exec_bit {
            set_executable_best_effort(&helper.path);
        }

        // LaunchHelper
        info!(
            "Handing off to {} to replace {}",
            helper.path.display(),
            executable.display()
        );
        let command = ProcessCommand::new(&helper.path).arg(&executable).arg(staged_replacement);
        let pid = self.runner.spawn_detached(&command).map_err(|e| LauncherError::HelperLaunchError {
            path: helper.path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Handoff {
            helper: helper.path,
            pid,
        })
    }
}
