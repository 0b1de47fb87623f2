//! File system helpers used by the installer and the self-updater.
//!
//! Failures that matter to callers are reported as [`LauncherError::FileSystemError`]
//! with the operation and path filled in. Best-effort variants (`*_best_effort`) only
//! log a warning, for cleanup that must never fail an otherwise successful operation.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::LauncherError;

/// Ensures a directory exists, creating it and its parents if needed.
///
/// # Errors
///
/// Returns [`LauncherError::FileSystemError`] when the directory cannot be created
/// or the path exists but is not a directory.
pub fn ensure_dir(path: &Path, operation: &str) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    if path.exists() {
        return Err(LauncherError::FileSystemError {
            operation: operation.to_string(),
            path: path.display().to_string(),
            reason: "path exists but is not a directory".to_string(),
        }
        .into());
    }

    fs::create_dir_all(path).map_err(|e| LauncherError::file_system(operation, path, &e))?;
    Ok(())
}

/// Copies `src` to `dst`, creating the destination's parent directory.
///
/// The copy goes through a sibling temporary file which is renamed into place, so a
/// reader never observes a half-written `dst`.
pub async fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::file_system("creating destination directory", parent, &e))?;
    }

    let file_name = dst.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let temp = dst.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    if let Err(e) = tokio::fs::copy(src, &temp).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(LauncherError::file_system("copying file", dst, &e).into());
    }

    if let Err(e) = tokio::fs::rename(&temp, dst).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(LauncherError::file_system("moving file into place", dst, &e).into());
    }

    tracing::debug!("Copied {} -> {}", src.display(), dst.display());
    Ok(())
}

/// Marks a file as executable (`rwxr-xr-x`) on Unix. No-op elsewhere.
#[cfg(unix)]
pub fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path)
        .map_err(|e| LauncherError::file_system("reading permissions", path, &e))?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)
        .map_err(|e| LauncherError::file_system("setting executable permission", path, &e))?;
    Ok(())
}

/// Marks a file as executable (`rwxr-xr-x`) on Unix. No-op elsewhere.
#[cfg(not(unix))]
pub fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Like [`set_executable`] but only logs failures.
pub fn set_executable_best_effort(path: &Path) {
    if let Err(e) = set_executable(path) {
        tracing::warn!("Could not mark {} executable: {e:#}", path.display());
    }
}

/// Removes a directory tree, logging instead of failing. Missing paths are fine.
pub fn remove_dir_best_effort(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => tracing::debug!("Removed directory {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove directory {}: {e}", path.display()),
    }
}

/// Removes a file, logging instead of failing. Missing files are fine.
pub fn remove_file_best_effort(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove file {}: {e}", path.display()),
    }
}

/// A file that is deleted when the guard is dropped, unless [`keep`](Self::keep) is called.
///
/// Used for partial downloads and temporary copies so that every exit path,
/// including `?` returns and cancellation, cleans up after itself.
#[derive(Debug)]
pub struct FileGuard {
    path: PathBuf,
    armed: bool,
}

impl FileGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarms the guard and hands the path back to the caller.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        if self.armed {
            remove_file_best_effort(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_creates_nested() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");

        ensure_dir(&nested, "creating test dir").unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested, "creating test dir").unwrap();
    }

    #[test]
    fn test_ensure_dir_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();

        let err = ensure_dir(&file, "creating target directory").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::FileSystemError { .. })
        ));
    }

    #[tokio::test]
    async fn test_copy_file_creates_parent() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.bin");
        let dst = temp.path().join("out").join("dst.bin");
        fs::write(&src, b"payload").unwrap();

        copy_file(&src, &dst).await.unwrap();

        assert_eq!(fs::read(&dst).unwrap(), b"payload");
        let leftovers: Vec<_> = fs::read_dir(dst.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_file_guard_removes_unless_kept() {
        let temp = TempDir::new().unwrap();
        let dropped = temp.path().join("dropped");
        let kept = temp.path().join("kept");
        fs::write(&dropped, "x").unwrap();
        fs::write(&kept, "x").unwrap();

        drop(FileGuard::new(&dropped));
        let path = FileGuard::new(&kept).keep();

        assert!(!dropped.exists());
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_set_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let file = temp.path().join("tool");
        fs::write(&file, "#!/bin/sh\n").unwrap();

        set_executable(&file).unwrap();
        let mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_best_effort_removal_of_missing_paths() {
        let temp = TempDir::new().unwrap();
        remove_file_best_effort(&temp.path().join("missing"));
        remove_dir_best_effort(&temp.path().join("missing-dir"));
    }
}
