//! HyPrism - a game launcher that keeps the game and itself up to date
//!
//! This crate holds the parts of the launcher that move bytes and change files on
//! disk: fetching patch artifacts, verifying them, applying them with an external
//! patch tool, and replacing the launcher binary through an update helper.
//!
//! # Architecture Overview
//!
//! ```text
//!  Asset ──► Downloader ──► ChecksumVerifier ──► PatchApplier ──► game directory
//!                │                                    │
//!            cache dir                        staging-temp + patch tool
//!
//!  ReleaseSource ──► HelperProvisioner ──► SelfUpdateOrchestrator ──► exit(0)
//! ```
//!
//! Every long-running operation reports [`core::ProgressUpdate`] snapshots to an
//! optional callback and honours a [`tokio_util::sync::CancellationToken`].
//!
//! # Core Modules
//!
//! ## Install Pipeline
//! - [`download`] - streaming downloads with progress and SHA-256 verification
//! - [`install`] - staging directories and the patch application state machine
//! - [`process`] - the subprocess seam used to run external tools
//!
//! ## Self-Update
//! - [`upgrade`] - release lookup, helper provisioning and the hand-off
//!
//! ## Supporting Modules
//! - [`core`] - the error taxonomy and progress model
//! - [`config`] - the launcher settings file
//! - [`news`] - game news scraping
//! - [`utils`] - platform capabilities, directory layout and filesystem helpers
//! - [`cli`] - the `hyprism` command line
//!
//! # Error Handling
//!
//! Public operations return [`anyhow::Result`]. Failures originate as
//! [`core::LauncherError`] values, so callers can branch on the condition:
//!
//! ```rust,no_run
//! use hyprism::core::LauncherError;
//!
//! # fn handle(err: anyhow::Error) {
//! match err.downcast_ref::<LauncherError>() {
//!     Some(LauncherError::Cancelled { .. }) => println!("cancelled"),
//!     Some(LauncherError::ChecksumMismatch { name, .. }) => println!("{name} is corrupt"),
//!     _ => println!("{err:#}"),
//! }
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod download;
pub mod install;
pub mod news;
pub mod process;
pub mod upgrade;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
