//! Core types shared across HyPrism
//!
//! - [`error`] - the [`LauncherError`] taxonomy and user-facing error rendering
//! - [`progress`] - install lifecycle stages and progress snapshots

pub mod error;
pub mod progress;

pub use error::{ErrorContext, LauncherError, user_friendly_error};
pub use progress::{DownloadProgress, InstallStage, ProgressCallback, ProgressUpdate, StageTracker};
