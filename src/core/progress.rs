//! Progress reporting types shared by the downloader and the patch applier.
//!
//! A single install or update attempt moves through the [`InstallStage`] lifecycle.
//! Components report where they are by emitting [`ProgressUpdate`] snapshots to a
//! caller-supplied [`ProgressCallback`]. Snapshots are not persisted.
//!
//! [`StageTracker`] enforces the ordering guarantees within one operation: stages
//! only move forward, `Failed` is terminal, and byte counts never go backwards
//! within a stage.

use serde::Serialize;
use std::fmt;

/// Lifecycle of one install/update attempt.
///
/// Variants are declared in lifecycle order; the derived [`Ord`] follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStage {
    /// Nothing has started yet.
    Idle,
    /// Transferring an artifact.
    Downloading,
    /// Checking a downloaded artifact's digest.
    Verifying,
    /// Preparing the staging directory.
    Staging,
    /// The external patch tool is running.
    Applying,
    /// Post-apply fixups such as permission bits.
    Finalizing,
    /// Terminal success.
    Complete,
    /// Terminal failure.
    Failed,
}

impl InstallStage {
    /// Whether this stage ends the operation.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Transitions are strictly forward. `Failed` is reachable from every
    /// non-terminal stage. Re-reporting the current stage is allowed so that a
    /// stage can emit several updates.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Failed {
            return true;
        }
        next >= self
    }

    /// Short lowercase label used in logs and terminal output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Downloading => "downloading",
            Self::Verifying => "verifying",
            Self::Staging => "staging",
            Self::Applying => "applying",
            Self::Finalizing => "finalizing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Transfer snapshot emitted while downloading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadProgress {
    /// Bytes written so far. Monotonic within one operation.
    pub bytes_downloaded: u64,
    /// Total size, `0` when unknown.
    pub bytes_total: u64,
    /// Throughput measured since the previous snapshot.
    pub rate_bytes_per_sec: f64,
    /// Name of the file being transferred.
    pub current_file_name: String,
}

impl DownloadProgress {
    /// Percentage complete, or `None` when the total is unknown.
    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        if self.bytes_total == 0 {
            return None;
        }
        Some((self.bytes_downloaded as f64 / self.bytes_total as f64 * 100.0).min(100.0))
    }
}

/// One progress snapshot delivered to a [`ProgressCallback`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    /// Current lifecycle stage.
    pub stage: InstallStage,
    /// Percentage within the stage (0-100).
    pub percent: f64,
    /// Human readable status line.
    pub message: String,
    /// Transfer details while downloading.
    pub transfer: Option<DownloadProgress>,
}

impl ProgressUpdate {
    /// Creates a stage update without transfer details.
    pub fn stage(stage: InstallStage, percent: f64, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent,
            message: message.into(),
            transfer: None,
        }
    }
}

/// Caller-supplied sink for progress snapshots.
pub type ProgressCallback<'a> = dyn Fn(&ProgressUpdate) + Send + Sync + 'a;

/// Enforces stage ordering for the updates of a single operation.
///
/// Updates that would move backwards are dropped with a debug log instead of
/// being delivered, so callers can rely on non-decreasing stages and byte counts.
pub struct StageTracker<'a> {
    callback: Option<&'a ProgressCallback<'a>>,
    stage: InstallStage,
    last_bytes: u64,
}

impl<'a> StageTracker<'a> {
    /// Creates a tracker in [`InstallStage::Idle`].
    pub fn new(callback: Option<&'a ProgressCallback<'a>>) -> Self {
        Self {
            callback,
            stage: InstallStage::Idle,
            last_bytes: 0,
        }
    }

    /// The most recently emitted stage.
    #[must_use]
    pub const fn current(&self) -> InstallStage {
        self.stage
    }

    /// Emits `update` if it respects the ordering rules. Returns whether it was delivered.
    pub fn emit(&mut self, update: ProgressUpdate) -> bool {
        if !self.stage.can_transition_to(update.stage) {
            tracing::debug!(
                "Dropping out-of-order progress update: {} -> {}",
                self.stage,
                update.stage
            );
            return false;
        }

        if update.stage != self.stage {
            self.last_bytes = 0;
        }
        if let Some(transfer) = &update.transfer {
            if transfer.bytes_downloaded < self.last_bytes {
                return false;
            }
            self.last_bytes = transfer.bytes_downloaded;
        }

        self.stage = update.stage;
        if let Some(callback) = self.callback {
            callback(&update);
        }
        true
    }

    /// Emits a plain stage update.
    pub fn enter(&mut self, stage: InstallStage, percent: f64, message: impl Into<String>) -> bool {
        self.emit(ProgressUpdate::stage(stage, percent, message))
    }

    /// Marks the operation failed. No-op if it already reached a terminal stage.
    pub fn fail(&mut self, message: impl Into<String>) {
        if !self.stage.is_terminal() {
            self.enter(InstallStage::Failed, 0.0, message);
        }
    }
}
