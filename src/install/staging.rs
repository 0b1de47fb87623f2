//! Scratch space for the external patch tool.
//!
//! A [`StagingContext`] is owned by exactly one apply invocation. It is released
//! when dropped, so every exit path (early return, `?`, cancellation) removes the
//! staging directory. Removal failures are only logged: by the time cleanup runs
//! the patch tool may already have finished its authoritative work.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::constants::STAGING_DIR_NAME;
use crate::utils::fs::{ensure_dir, remove_dir_best_effort};

/// Creates and tears down staging directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct StagingManager;

impl StagingManager {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Path the staging directory for `target_dir` would have.
    #[must_use]
    pub fn staging_path(&self, target_dir: &Path) -> PathBuf {
        target_dir.join(STAGING_DIR_NAME)
    }

    /// Creates `target_dir` and a fresh staging directory inside it.
    ///
    /// Leftovers from an interrupted earlier run are removed first so the tool
    /// always starts from empty scratch space.
    ///
    /// # Errors
    ///
    /// [`LauncherError::FileSystemError`](crate::core::LauncherError::FileSystemError)
    /// when either directory cannot be created.
    pub fn acquire(&self, target_dir: &Path) -> Result<StagingContext> {
        ensure_dir(target_dir, "creating target directory")?;

        let staging_dir = self.staging_path(target_dir);
        if staging_dir.exists() {
            tracing::debug!("Removing stale staging directory {}", staging_dir.display());
            remove_dir_best_effort(&staging_dir);
        }
        ensure_dir(&staging_dir, "creating staging directory")?;

        tracing::debug!("Acquired staging directory {}", staging_dir.display());
        Ok(StagingContext {
            staging_dir,
            target_dir: target_dir.to_path_buf(),
            released: false,
        })
    }

    /// Removes the staging directory. Equivalent to dropping the context.
    pub fn release(&self, context: StagingContext) {
        drop(context);
    }
}

/// A staging directory and the target it belongs to.
#[derive(Debug)]
pub struct StagingContext {
    staging_dir: PathBuf,
    target_dir: PathBuf,
    released: bool,
}

impl StagingContext {
    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    #[must_use]
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    fn release_now(&mut self) {
        if !self.released {
            self.released = true;
            remove_dir_best_effort(&self.staging_dir);
        }
    }
}

impl Drop for StagingContext {
    fn drop(&mut self) {
        self.release_now();
    }
}
