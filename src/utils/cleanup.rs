//! Deferred best-effort file removal.
//!
//! Patch artifacts are deleted a short while after an install finishes instead of
//! inline, so a caller that is still reading the file (for logging, say) is not
//! raced. Failures are logged and never reported back to the operation.
//!
//! Short-lived processes call [`DeferredCleanup::wait_idle`] before exiting so the
//! scheduled removals are not lost with the runtime.

use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Schedules delayed removals on the tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct DeferredCleanup {
    tasks: TaskTracker,
}

impl DeferredCleanup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for every removal scheduled so far.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Removes `path` after `delay`. The returned handle may be dropped; the task
    /// keeps running in the background.
    pub fn schedule_removal(&self, path: impl Into<PathBuf>, delay: Duration) -> JoinHandle<()> {
        let path = path.into();
        tracing::debug!("Scheduling removal of {} in {:?}", path.display(), delay);

        self.tasks.spawn(async move {
            tokio::time::sleep(delay).await;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!("{} was already gone", path.display());
                }
                Err(e) => tracing::warn!("Deferred removal of {} failed: {e}", path.display()),
            }
        })
    }
}
