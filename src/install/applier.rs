//! Game patch application
//!
//! [`PatchApplier::apply`] installs or upgrades a game directory from a downloaded
//! patch artifact by running the external patch tool. Each call walks a fixed
//! sequence:
//!
//! ```text
//! CheckInstalled ──► AlreadyInstalled                       (marker present)
//!       │
//!       ▼
//!   Prepared (staging acquired) ──► Applying ──► Applied
//!                                        └─────► ApplyFailed
//! ```
//!
//! The "already installed" check only looks for the platform marker executable.
//! The applier never creates that file itself; only a successful tool run does,
//! so a failed attempt can always be retried.
//!
//! At most one apply may run against a given target directory at a time.
//! Serializing calls per target is the caller's job.

use anyhow::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::{PATCH_CLEANUP_DELAY_APPLIED, PATCH_CLEANUP_DELAY_INSTALLED, PATCH_TOOL_TIMEOUT};
use crate::core::{InstallStage, LauncherError, ProgressCallback, ProgressUpdate, StageTracker};
use crate::install::staging::StagingManager;
use crate::process::{CommandRunner, ProcessCommand, SystemCommandRunner};
use crate::utils::cleanup::DeferredCleanup;
use crate::utils::fs::set_executable_best_effort;
use crate::utils::platform::{AppLayout, PATCH_TOOL_BASE_NAME, PlatformProfile};

static PERCENT_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)\s?%").ok());

/// Highest percentage reported while the tool is still running.
const MAX_RUNNING_PERCENT: f64 = 99.0;

/// Location of the external patch tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchTool {
    path: PathBuf,
}

impl PatchTool {
    /// Uses the tool at `path` without probing.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Resolves the tool: `explicit` first, then the launcher's bundled copy in
    /// `<app dir>/butler/`, then `PATH`.
    ///
    /// # Errors
    ///
    /// [`LauncherError::PatchToolNotFound`] when no candidate exists. An explicit
    /// path that does not exist is an error even if another copy would be found.
    pub fn locate(explicit: Option<&Path>, layout: &AppLayout) -> Result<Self> {
        let profile = PlatformProfile::current();

        if let Some(explicit) = explicit {
            if explicit.is_file() {
                debug!("Using patch tool from explicit path {}", explicit.display());
                return Ok(Self::at(explicit));
            }
            return Err(LauncherError::PatchToolNotFound {
                tool: explicit.display().to_string(),
            }
            .into());
        }

        let bundled = layout.butler_dir().join(profile.executable_name(PATCH_TOOL_BASE_NAME));
        if bundled.is_file() {
            debug!("Using bundled patch tool {}", bundled.display());
            return Ok(Self::at(bundled));
        }

        match which::which(PATCH_TOOL_BASE_NAME) {
            Ok(path) => {
                debug!("Using patch tool from PATH: {}", path.display());
                Ok(Self::at(path))
            }
            Err(_) => Err(LauncherError::PatchToolNotFound {
                tool: PATCH_TOOL_BASE_NAME.to_string(),
            }
            .into()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fails with [`LauncherError::PatchToolNotFound`] if the tool file is gone.
    pub fn ensure_present(&self) -> Result<()> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(LauncherError::PatchToolNotFound {
                tool: self.path.display().to_string(),
            }
            .into())
        }
    }

    fn apply_command(&self, staging_dir: &Path, patch_file: &Path, target_dir: &Path) -> ProcessCommand {
        ProcessCommand::new(&self.path)
            .arg("apply")
            .arg("--staging-dir")
            .arg(staging_dir)
            .arg(patch_file)
            .arg(target_dir)
    }
}

/// How a successful [`PatchApplier::apply`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The marker executable was already present; nothing was run.
    AlreadyInstalled,
    /// The patch tool ran and succeeded.
    Applied,
}

/// Applies patch artifacts to game directories.
pub struct PatchApplier<R = SystemCommandRunner> {
    runner: R,
    tool: PatchTool,
    profile: PlatformProfile,
    staging: StagingManager,
    cleanup: DeferredCleanup,
    timeout: Option<Duration>,
    installed_cleanup_delay: Duration,
    applied_cleanup_delay: Duration,
}

impl PatchApplier<SystemCommandRunner> {
    /// Applier using real subprocesses and the current platform profile.
    pub fn new(tool: PatchTool) -> Self {
        Self::with_runner(SystemCommandRunner::new(), tool)
    }
}

impl<R: CommandRunner> PatchApplier<R> {
    /// Applier using a custom [`CommandRunner`].
    pub fn with_runner(runner: R, tool: PatchTool) -> Self {
        Self {
            runner,
            tool,
            profile: PlatformProfile::current(),
            staging: StagingManager::new(),
            cleanup: DeferredCleanup::new(),
            timeout: Some(PATCH_TOOL_TIMEOUT),
            installed_cleanup_delay: PATCH_CLEANUP_DELAY_INSTALLED,
            applied_cleanup_delay: PATCH_CLEANUP_DELAY_APPLIED,
        }
    }

    #[must_use]
    pub fn with_profile(mut self, profile: PlatformProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Overrides the patch tool timeout (`None` disables it).
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the delays before patch files are deleted.
    #[must_use]
    pub const fn with_cleanup_delays(mut self, installed: Duration, applied: Duration) -> Self {
        self.installed_cleanup_delay = installed;
        self.applied_cleanup_delay = applied;
        self
    }

    #[must_use]
    pub const fn tool(&self) -> &PatchTool {
        &self.tool
    }

    /// Waits until the patch files scheduled for deletion are gone.
    pub async fn wait_for_cleanup(&self) {
        self.cleanup.wait_idle().await;
    }

    /// Whether `target_dir` already holds a complete install. Side-effect free.
    #[must_use]
    pub fn is_installed(&self, target_dir: &Path) -> bool {
        self.profile.marker_path(target_dir).is_file()
    }

    /// Installs `patch_file` into `target_dir`.
    ///
    /// On success (including the already-installed short circuit) the patch file
    /// is deleted a moment later in the background. On failure it is kept so the
    /// caller can retry without downloading again.
    ///
    /// # Errors
    ///
    /// - [`LauncherError::PatchToolNotFound`] before anything is created
    /// - [`LauncherError::FileSystemError`] when the target or staging directory
    ///   cannot be created; the tool is not run
    /// - [`LauncherError::PatchToolError`] with the tool's output when it fails
    /// - [`LauncherError::Cancelled`] when `cancel` fires; the tool is killed
    pub async fn apply(
        &self,
        patch_file: &Path,
        target_dir: &Path,
        on_progress: Option<&ProgressCallback<'_>>,
        cancel: &CancellationToken,
    ) -> Result<ApplyOutcome> {
        let tracker = Mutex::new(ApplyProgress {
            tracker: StageTracker::new(on_progress),
            percent: 0.0,
        });

        let result = self.apply_inner(patch_file, target_dir, &tracker, cancel).await;
        if let Err(e) = &result
            && let Ok(mut progress) = tracker.lock()
        {
            progress.tracker.fail(e.to_string());
        }
        result
    }

    async fn apply_inner(
        &self,
        patch_file: &Path,
        target_dir: &Path,
        progress: &Mutex<ApplyProgress<'_>>,
        cancel: &CancellationToken,
    ) -> Result<ApplyOutcome> {
        let marker = self.profile.marker_path(target_dir);

        // CheckInstalled
        if marker.is_file() {
            info!("Game files detected in {}, skipping patch installation", target_dir.display());
            stage(progress, InstallStage::Complete, 100.0, "Game already installed");
            self.cleanup.schedule_removal(patch_file, self.installed_cleanup_delay);
            return Ok(ApplyOutcome::AlreadyInstalled);
        }

        if cancel.is_cancelled() {
            return Err(LauncherError::cancelled("applying patch").into());
        }
        self.tool.ensure_present()?;

        // Prepared
        let staging = self.staging.acquire(target_dir)?;
        stage(progress, InstallStage::Staging, 0.0, "Preparing installation");

        // Applying
        info!("Applying patch {} with {}", patch_file.display(), self.tool.path().display());
        debug!("Game directory: {}", target_dir.display());
        stage(progress, InstallStage::Applying, 0.0, "Installing game files");

        let command = self
            .tool
            .apply_command(staging.staging_dir(), patch_file, target_dir)
            .with_timeout(self.timeout);

        let observer = |line: &str| {
            if let Some(percent) = parse_percent(line)
                && let Ok(mut progress) = progress.lock()
            {
                progress.advance(percent, line);
            }
        };

        let output = self.runner.run(&command, Some(&observer), cancel).await?;

        if !output.success {
            warn!("Patch tool failed ({}):\n{}", output.exit_details(), output.combined_output);
            self.staging.release(staging);
            return Err(LauncherError::PatchToolError {
                exit_details: output.exit_details(),
                output: output.combined_output,
            }
            .into());
        }

        debug!("Patch tool output:\n{}", output.combined_output);

        // Applied
        self.staging.release(staging);
        self.cleanup.schedule_removal(patch_file, self.applied_cleanup_delay);

        stage(progress, InstallStage::Finalizing, 100.0, "Finalizing installation");
        if self.profile.needs_exec_bit {
            set_executable_best_effort(&marker);
        }

        stage(progress, InstallStage::Complete, 100.0, "Game installed successfully");
        info!("Installation complete");
        Ok(ApplyOutcome::Applied)
    }
}

struct ApplyProgress<'a> {
    tracker: StageTracker<'a>,
    percent: f64,
}

impl ApplyProgress<'_> {
    fn advance(&mut self, percent: f64, line: &str) {
        let percent = percent.min(MAX_RUNNING_PERCENT);
        if percent > self.percent {
            self.percent = percent;
            self.tracker.emit(ProgressUpdate::stage(InstallStage::Applying, percent, line.trim()));
        }
    }
}

fn stage(progress: &Mutex<ApplyProgress<'_>>, stage: InstallStage, percent: f64, message: &str) {
    if let Ok(mut progress) = progress.lock() {
        progress.tracker.enter(stage, percent, message);
    }
}

/// Extracts the last percentage figure from a line of tool output.
fn parse_percent(line: &str) -> Option<f64> {
    let pattern = PERCENT_PATTERN.as_ref()?;
    pattern
        .captures_iter(line)
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .filter(|p| (0.0..=100.0).contains(p))
        .last()
}
