//! Terminal rendering of install and update progress
//!
//! [`ProgressRenderer`] turns the [`ProgressUpdate`] snapshots emitted by the
//! downloader and the patch applier into an `indicatif` bar. Byte-level transfer
//! snapshots drive a download-style bar; every other stage drives a percentage bar
//! with the stage label as prefix.
//!
//! # Environment Variables
//!
//! - `HYPRISM_NO_PROGRESS`: Set to any value to disable all progress indicators
//!
//! ```rust,no_run
//! use hyprism::core::ProgressUpdate;
//! use hyprism::utils::progress::ProgressRenderer;
//!
//! let renderer = ProgressRenderer::new(true);
//! let sink = |update: &ProgressUpdate| renderer.update(update);
//! // pass `Some(&sink)` to Downloader::fetch or PatchApplier::apply
//! # let _ = sink;
//! renderer.finish();
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::sync::Mutex;

use crate::core::{InstallStage, ProgressUpdate};

/// Environment variable that disables progress indicators.
pub const NO_PROGRESS_ENV: &str = "HYPRISM_NO_PROGRESS";

/// Checks if progress bars should be disabled.
///
/// Progress bars are disabled when `HYPRISM_NO_PROGRESS` is set to any value.
#[must_use]
pub fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// Renders [`ProgressUpdate`] snapshots to the terminal.
pub struct ProgressRenderer {
    bar: IndicatifBar,
    mode: Mutex<BarMode>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BarMode {
    Percent,
    Bytes,
}

impl ProgressRenderer {
    /// Creates a renderer. A hidden bar is used when `enabled` is false or
    /// `HYPRISM_NO_PROGRESS` is set.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        let bar = if enabled && !is_progress_disabled() {
            let bar = IndicatifBar::new(100);
            bar.set_style(percent_style());
            bar
        } else {
            IndicatifBar::hidden()
        };
        Self {
            bar,
            mode: Mutex::new(BarMode::Percent),
        }
    }

    /// Whether anything is drawn.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }

    /// Applies one snapshot to the bar.
    pub fn update(&self, update: &ProgressUpdate) {
        let Ok(mut mode) = self.mode.lock() else {
            return;
        };

        match &update.transfer {
            Some(transfer) if transfer.bytes_total > 0 => {
                if *mode != BarMode::Bytes {
                    self.bar.set_style(download_style());
                    *mode = BarMode::Bytes;
                }
                self.bar.set_length(transfer.bytes_total);
                self.bar.set_position(transfer.bytes_downloaded);
                self.bar.set_message(transfer.current_file_name.clone());
            }
            _ => {
                if *mode != BarMode::Percent {
                    self.bar.set_style(percent_style());
                    self.bar.set_length(100);
                    *mode = BarMode::Percent;
                }
                self.bar.set_position(update.percent.clamp(0.0, 100.0) as u64);
                self.bar.set_message(update.message.clone());
            }
        }
        self.bar.set_prefix(update.stage.label());

        match update.stage {
            InstallStage::Complete => self.bar.finish_with_message(update.message.clone()),
            InstallStage::Failed => self.bar.abandon_with_message(update.message.clone()),
            _ => {}
        }
    }

    /// Clears the bar from the terminal.
    pub fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

fn percent_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:>11.bold.cyan} [{bar:40.cyan/blue}] {percent:>3}% {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template(
            "{prefix:>11.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}
