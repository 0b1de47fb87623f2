//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`platform`] - per-OS capability table and the launcher's directory layout
//! - [`fs`] - copy, permission and best-effort removal helpers
//! - [`cleanup`] - delayed background removal of patch artifacts
//! - [`progress`] - terminal progress rendering
//!
//! # Example
//!
//! ```rust,no_run
//! use hyprism::utils::{AppLayout, PlatformProfile};
//!
//! # fn example() -> anyhow::Result<()> {
//! let layout = AppLayout::detect()?;
//! let profile = PlatformProfile::current();
//! let marker = profile.marker_path(&layout.game_dir("latest"));
//! println!("installed: {}", marker.exists());
//! # Ok(())
//! # }
//! ```

pub mod cleanup;
pub mod fs;
pub mod platform;
pub mod progress;

pub use cleanup::DeferredCleanup;
pub use fs::{FileGuard, copy_file, ensure_dir, set_executable};
pub use platform::{AppLayout, OsFamily, PlatformProfile};
pub use progress::ProgressRenderer;
