//! Platform-specific layout and capability helpers
//!
//! HyPrism needs a handful of facts that differ by operating system: where the
//! "already installed" marker executable lives inside a game directory, what suffix
//! executables carry, and whether freshly written binaries need their executable
//! bit set. Rather than scattering `cfg!` checks through the installer, these are
//! collected in a small capability table, [`PlatformProfile`], resolved once.
//!
//! [`AppLayout`] computes the well-known per-user directories:
//!
//! ```text
//! <data-local-dir>/HyPrism/
//! ├── release/package/game/<version>/   # installed game versions
//! ├── butler/                           # bundled patch tool
//! ├── cache/                            # downloads in flight
//! ├── logs/
//! ├── jre/
//! ├── crashes/
//! └── UserData/
//! ```
//!
//! | OS | marker executable | exe suffix | exec bit |
//! |---------|----------------------------------------------|------|-----|
//! | Windows | `Client/HytaleClient.exe` | `.exe` | no |
//! | macOS | `Client/Hytale.app/Contents/MacOS/HytaleClient` | | yes |
//! | Linux | `Client/HytaleClient` | | yes |

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::constants::APP_DIR_NAME;

/// Base name of the self-update helper executable.
pub const HELPER_BASE_NAME: &str = "update-helper";

/// Base name of the external patch tool.
pub const PATCH_TOOL_BASE_NAME: &str = "butler";

/// Environment variable that overrides the application directory.
pub const HOME_OVERRIDE_ENV: &str = "HYPRISM_HOME";

/// Operating systems with distinct install layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    /// Microsoft Windows
    Windows,
    /// Apple macOS
    MacOs,
    /// Linux and other Unix-likes
    Linux,
}

impl OsFamily {
    /// The family of the running build.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    /// Short name used in release asset file names.
    #[must_use]
    pub const fn asset_name(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
        }
    }
}

/// Per-OS capability table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Which OS this profile describes.
    pub os: OsFamily,
    /// Path segments of the marker executable, relative to a game directory.
    pub marker_segments: &'static [&'static str],
    /// Suffix appended to executable names (`.exe` on Windows).
    pub exe_suffix: &'static str,
    /// Whether written executables need `chmod +x`.
    pub needs_exec_bit: bool,
}

impl PlatformProfile {
    /// Profile for an explicit OS family.
    #[must_use]
    pub const fn for_os(os: OsFamily) -> Self {
        match os {
            OsFamily::Windows => Self {
                os,
                marker_segments: &["Client", "HytaleClient.exe"],
                exe_suffix: ".exe",
                needs_exec_bit: false,
            },
            OsFamily::MacOs => Self {
                os,
                marker_segments: &["Client", "Hytale.app", "Contents", "MacOS", "HytaleClient"],
                exe_suffix: "",
                needs_exec_bit: true,
            },
            OsFamily::Linux => Self {
                os,
                marker_segments: &["Client", "HytaleClient"],
                exe_suffix: "",
                needs_exec_bit: true,
            },
        }
    }

    /// Profile of the running build.
    #[must_use]
    pub const fn current() -> Self {
        Self::for_os(OsFamily::current())
    }

    /// Location of the marker executable under `game_dir`.
    #[must_use]
    pub fn marker_path(&self, game_dir: &Path) -> PathBuf {
        self.marker_segments.iter().fold(game_dir.to_path_buf(), |path, segment| path.join(segment))
    }

    /// File name of an executable with the platform suffix applied.
    #[must_use]
    pub fn executable_name(&self, base: &str) -> String {
        format!("{base}{}", self.exe_suffix)
    }

    /// File name of the update helper.
    #[must_use]
    pub fn helper_file_name(&self) -> String {
        self.executable_name(HELPER_BASE_NAME)
    }

    /// Release asset name for an executable built for this OS and the current architecture.
    ///
    /// ```rust
    /// use hyprism::utils::platform::{OsFamily, PlatformProfile};
    ///
    /// let name = PlatformProfile::for_os(OsFamily::Windows).release_asset_name("update-helper");
    /// assert!(name.starts_with("update-helper-windows-"));
    /// assert!(name.ends_with(".exe"));
    /// ```
    #[must_use]
    pub fn release_asset_name(&self, base: &str) -> String {
        format!("{base}-{}-{}{}", self.os.asset_name(), std::env::consts::ARCH, self.exe_suffix)
    }
}

/// Well-known per-user directories of the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLayout {
    root: PathBuf,
}

impl AppLayout {
    /// Layout rooted at an explicit directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Layout rooted at the platform default (or `HYPRISM_HOME` when set).
    ///
    /// # Errors
    ///
    /// Fails when neither the override nor a platform data directory can be
    /// determined.
    pub fn detect() -> Result<Self> {
        if let Some(root) = std::env::var_os(HOME_OVERRIDE_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }

        let base = dirs::data_local_dir().or_else(dirs::data_dir).ok_or_else(|| {
            let platform_help = if cfg!(windows) {
                "On Windows: Check that the LOCALAPPDATA or APPDATA environment variable is set"
            } else {
                "Check that the HOME environment variable is set"
            };
            anyhow::anyhow!("Could not determine application directory.\n\n{platform_help}")
        })?;

        Ok(Self::with_root(base.join(APP_DIR_NAME)))
    }

    /// The application directory itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of an installed game version (`release/package/game/<version>`).
    #[must_use]
    pub fn game_dir(&self, version: &str) -> PathBuf {
        self.root.join("release").join("package").join("game").join(version)
    }

    #[must_use]
    pub fn butler_dir(&self) -> PathBuf {
        self.root.join("butler")
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    #[must_use]
    pub fn jre_dir(&self) -> PathBuf {
        self.root.join("jre")
    }

    #[must_use]
    pub fn user_data_dir(&self) -> PathBuf {
        self.root.join("UserData")
    }

    /// Default location of the launcher configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Creates the full directory tree.
    pub fn create_folders(&self) -> Result<()> {
        let folders = [
            self.root.clone(),
            self.game_dir("latest"),
            self.jre_dir(),
            self.butler_dir(),
            self.cache_dir(),
            self.logs_dir(),
            self.root.join("crashes"),
            self.user_data_dir(),
        ];

        for folder in &folders {
            std::fs::create_dir_all(folder)
                .with_context(|| format!("Failed to create directory: {}", folder.display()))?;
        }
        Ok(())
    }
}

/// Path of the currently running executable.
pub fn current_exe() -> Result<PathBuf> {
    std::env::current_exe().context("Failed to determine the current executable path")
}
