//! Global constants used throughout HyPrism.
//!
//! Timeouts, delays and throttling intervals shared by several modules are
//! defined here so magic numbers stay discoverable.

use std::time::Duration;

/// Directory name of the per-user application directory.
pub const APP_DIR_NAME: &str = "HyPrism";

/// User agent sent with every HTTP request.
pub const USER_AGENT: &str = concat!("HyPrism/", env!("CARGO_PKG_VERSION"));

/// Connect timeout for HTTP requests (15 seconds).
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Minimum interval between two download progress callbacks (100ms).
///
/// The final snapshot of a download is always delivered regardless of this
/// interval.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Delay before deleting a patch file after detecting an existing install (1 second).
pub const PATCH_CLEANUP_DELAY_INSTALLED: Duration = Duration::from_secs(1);

/// Delay before deleting a patch file after a successful apply (2 seconds).
pub const PATCH_CLEANUP_DELAY_APPLIED: Duration = Duration::from_secs(2);

/// Upper bound for a single patch tool run (2 hours).
///
/// Full game installs on slow disks take a long time; this only guards
/// against a hung tool.
pub const PATCH_TOOL_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Name of the staging directory created inside the target directory.
pub const STAGING_DIR_NAME: &str = "staging-temp";

/// How long fetched news stays fresh (10 minutes).
pub const NEWS_CACHE_TTL: Duration = Duration::from_secs(600);

/// Timeout for fetching the news index page (15 seconds).
pub const NEWS_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for fetching a single news article page (10 seconds).
pub const NEWS_ARTICLE_TIMEOUT: Duration = Duration::from_secs(10);
