//! The launcher settings file.
//!
//! A single flat TOML document stored at `<app dir>/config.toml`:
//!
//! ```toml
//! version = "1.0.0"
//! nick = "Steven"
//! music_enabled = true
//! version_type = "release"
//! selected_version = 0
//! auto_update_latest = true
//! online_mode = true
//! discord_rpc_enabled = true
//! max_memory = 2560
//! min_memory = 512
//! full_screen = false
//!
//! [updates]
//! release_owner = "hyprism"
//! release_repo = "hyprism"
//! # patch_tool_path = "/opt/butler/butler"
//! ```
//!
//! Every key is optional; missing keys take their defaults, so an older file keeps
//! loading after new settings are added.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::core::LauncherError;
use crate::utils::platform::AppLayout;

/// Environment variable pointing at an alternative configuration file.
pub const CONFIG_PATH_ENV: &str = "HYPRISM_CONFIG";

/// Launcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub version: String,
    /// In-game player name.
    pub nick: String,
    pub music_enabled: bool,
    /// Release channel (`release` or `pre-release`).
    pub version_type: String,
    /// Game version to launch; `0` means the latest one.
    pub selected_version: u32,
    /// Replaces the default game directory when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_instance_dir: Option<PathBuf>,
    pub auto_update_latest: bool,
    pub online_mode: bool,
    /// Custom authentication server; the default one is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    /// Java executable; the bundled runtime is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_path: Option<PathBuf>,
    pub discord_rpc_enabled: bool,
    /// Maximum game memory in MB.
    pub max_memory: u32,
    /// Minimum game memory in MB.
    pub min_memory: u32,
    pub full_screen: bool,
    pub updates: UpdatesConfig,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            nick: "Steven".to_string(),
            music_enabled: true,
            version_type: "release".to_string(),
            selected_version: 0,
            custom_instance_dir: None,
            auto_update_latest: true,
            online_mode: true,
            auth_domain: None,
            java_path: None,
            discord_rpc_enabled: true,
            max_memory: 2560,
            min_memory: 512,
            full_screen: false,
            updates: UpdatesConfig::default(),
        }
    }
}

/// Where updates come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatesConfig {
    /// GitHub owner of the launcher releases.
    pub release_owner: String,
    /// GitHub repository of the launcher releases.
    pub release_repo: String,
    /// Explicit patch tool location, tried before the bundled one and `PATH`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_tool_path: Option<PathBuf>,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            release_owner: "hyprism".to_string(),
            release_repo: "hyprism".to_string(),
            patch_tool_path: None,
        }
    }
}

impl LauncherConfig {
    /// Resolves the configuration file location.
    ///
    /// Precedence: `explicit`, then `HYPRISM_CONFIG`, then `<app dir>/config.toml`.
    #[must_use]
    pub fn resolve_path(explicit: Option<&Path>, layout: &AppLayout) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        match std::env::var_os(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => layout.config_path(),
        }
    }

    /// Loads the configuration, falling back to defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// [`LauncherError::ConfigError`] when the file exists but cannot be read or
    /// parsed. A broken file is never silently replaced with defaults.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(LauncherError::ConfigError {
                    message: format!("failed to read {}: {e}", path.display()),
                }
                .into());
            }
        };

        toml::from_str(&content).map_err(|e| {
            LauncherError::ConfigError {
                message: format!("failed to parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Writes the configuration as pretty TOML, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::file_system("creating config directory", parent, &e))?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| LauncherError::ConfigError {
            message: format!("failed to serialize configuration: {e}"),
        })?;

        fs::write(path, content)
            .await
            .map_err(|e| LauncherError::file_system("writing configuration", path, &e))?;
        debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Directory the selected game version is installed into.
    ///
    /// `custom_instance_dir` wins when set. Otherwise the versioned directory of the
    /// layout is used, with `selected_version == 0` mapping to `latest`.
    #[must_use]
    pub fn game_dir(&self, layout: &AppLayout) -> PathBuf {
        if let Some(dir) = &self.custom_instance_dir {
            return dir.clone();
        }
        layout.game_dir(&self.version_label())
    }

    /// Directory label of the selected version.
    #[must_use]
    pub fn version_label(&self) -> String {
        match self.selected_version {
            0 => "latest".to_string(),
            n => n.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = LauncherConfig::default();
        assert_eq!(config.nick, "Steven");
        assert_eq!(config.version_type, "release");
        assert_eq!(config.selected_version, 0);
        assert_eq!(config.max_memory, 2560);
        assert_eq!(config.min_memory, 512);
        assert!(config.music_enabled);
        assert!(config.online_mode);
        assert!(!config.full_screen);
        assert!(config.updates.patch_tool_path.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = LauncherConfig::load_from(&temp.path().join("config.toml")).await.unwrap();
        assert_eq!(config, LauncherConfig::default());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = LauncherConfig::default();
        config.nick = "Alex".to_string();
        config.selected_version = 7;
        config.updates.patch_tool_path = Some(PathBuf::from("/opt/butler"));
        config.save_to(&path).await.unwrap();

        let loaded = LauncherConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "nick = \"Kweebec\"\n[updates]\nrelease_repo = \"fork\"\n").unwrap();

        let config = LauncherConfig::load_from(&path).await.unwrap();
        assert_eq!(config.nick, "Kweebec");
        assert_eq!(config.max_memory, 2560);
        assert_eq!(config.updates.release_repo, "fork");
        assert_eq!(config.updates.release_owner, "hyprism");
    }

    #[tokio::test]
    async fn test_malformed_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "nick = [unterminated").unwrap();

        let err = LauncherConfig::load_from(&path).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_game_dir_resolution() {
        let layout = AppLayout::with_root("/data/HyPrism");
        let mut config = LauncherConfig::default();
        assert_eq!(config.game_dir(&layout), layout.game_dir("latest"));

        config.selected_version = 3;
        assert_eq!(config.game_dir(&layout), layout.game_dir("3"));

        config.custom_instance_dir = Some(PathBuf::from("/games/hytale"));
        assert_eq!(config.game_dir(&layout), PathBuf::from("/games/hytale"));
    }

    #[test]
    #[serial]
    fn test_resolve_path_precedence() {
        let layout = AppLayout::with_root("/data/HyPrism");

        // SAFETY: serialized with other environment-touching tests
        unsafe { std::env::remove_var(CONFIG_PATH_ENV) };
        assert_eq!(LauncherConfig::resolve_path(None, &layout), layout.config_path());

        unsafe { std::env::set_var(CONFIG_PATH_ENV, "/etc/hyprism.toml") };
        assert_eq!(
            LauncherConfig::resolve_path(None, &layout),
            PathBuf::from("/etc/hyprism.toml")
        );
        assert_eq!(
            LauncherConfig::resolve_path(Some(Path::new("/tmp/c.toml")), &layout),
            PathBuf::from("/tmp/c.toml")
        );
        unsafe { std::env::remove_var(CONFIG_PATH_ENV) };
    }
}
