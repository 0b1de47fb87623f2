//! Test utilities for HyPrism
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`init_test_logging`] for opt-in tracing output
//! - [`TestLayout`], an application directory inside a temporary directory
//! - shell scripts standing in for the patch tool (`#[cfg(unix)]`)
//!
//! # Example
//!
//! ```rust,no_run
//! use hyprism::test_utils::{TestLayout, init_test_logging};
//!
//! init_test_logging(None);
//! let env = TestLayout::new().unwrap();
//! let game_dir = env.layout.game_dir("latest");
//! # let _ = game_dir;
//! ```

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::utils::platform::{AppLayout, PlatformProfile};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Without a `level` logging stays off unless
/// `RUST_LOG` is set:
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true) // Show targets like "process"
            .with_thread_ids(false)
            .try_init();
    });
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// An application directory rooted in a fresh temporary directory.
pub struct TestLayout {
    pub temp: TempDir,
    pub layout: AppLayout,
}

impl TestLayout {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let layout = AppLayout::with_root(temp.path().join("HyPrism"));
        Ok(Self {
            temp,
            layout,
        })
    }

    /// Where the running platform expects the game executable inside `game_dir`.
    #[must_use]
    pub fn marker(&self, game_dir: &Path) -> PathBuf {
        PlatformProfile::current().marker_path(game_dir)
    }
}

/// Writes an executable `/bin/sh` script.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// A stand-in for the patch tool that behaves like a successful apply.
///
/// It is invoked as `apply --staging-dir <staging> <patch> <target>`, checks that
/// the staging directory exists, prints a few percentages and creates the game
/// executable (copying the patch into it) under the target directory.
#[cfg(unix)]
pub fn fake_patch_tool(dir: &Path) -> Result<PathBuf> {
    let profile = PlatformProfile::current();
    let marker = profile.marker_path(Path::new(""));
    let marker = marker.to_string_lossy();
    let body = format!(
        r#"[ "$1" = "apply" ] || {{ echo "unexpected command $1" >&2; exit 2; }}
[ -d "$3" ] || {{ echo "staging dir missing" >&2; exit 3; }}
echo "12.5%"
echo "48%" >&2
echo "100%"
mkdir -p "$(dirname "$5/{marker}")"
cp "$4" "$5/{marker}""#
    );
    write_script(dir, "butler", &body)
}

/// A stand-in for the patch tool that prints `message` to stderr and exits 1.
#[cfg(unix)]
pub fn failing_patch_tool(dir: &Path, message: &str) -> Result<PathBuf> {
    write_script(dir, "butler", &format!("echo \"{message}\" >&2\nexit 1"))
}
