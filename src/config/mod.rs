//! Configuration management for HyPrism
//!
//! The launcher keeps a single user-wide settings file. It is never required to
//! exist: a fresh install runs on defaults and writes the file on first save.
//!
//! # Configuration File Location
//!
//! - **Windows**: `%LOCALAPPDATA%\HyPrism\config.toml`
//! - **macOS**: `~/Library/Application Support/HyPrism/config.toml`
//! - **Linux**: `~/.local/share/HyPrism/config.toml`
//!
//! `HYPRISM_CONFIG` (or `--config` on the command line) points at a different
//! file; `HYPRISM_HOME` moves the whole application directory.
//!
//! # Examples
//!
//! ```rust,no_run
//! use hyprism::config::LauncherConfig;
//! use hyprism::utils::AppLayout;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let layout = AppLayout::detect()?;
//! let path = LauncherConfig::resolve_path(None, &layout);
//! let mut config = LauncherConfig::load_from(&path).await?;
//! config.full_screen = true;
//! config.save_to(&path).await?;
//! println!("Game directory: {}", config.game_dir(&layout).display());
//! # Ok(())
//! # }
//! ```

pub mod launcher;

pub use launcher::{CONFIG_PATH_ENV, LauncherConfig, UpdatesConfig};
