//! Error handling for HyPrism
//!
//! This module provides the error taxonomy and user-friendly error reporting for the
//! launcher's update and installation machinery. The error system follows two rules:
//! 1. **Strongly-typed errors** so callers can tell a user-initiated abort from a
//!    network failure, or a checksum problem from a broken patch tool
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`LauncherError`] - Enumerated error types for every failure mode
//! - [`ErrorContext`] - Wrapper that adds details and suggestions for display
//!
//! Operations throughout the crate return [`anyhow::Result`]. Failures are created as
//! [`LauncherError`] values and converted with `?`, so callers recover the precise
//! condition with [`anyhow::Error::downcast_ref`] even after context has been attached.
//!
//! # Examples
//!
//! ```rust,no_run
//! use hyprism::core::{LauncherError, user_friendly_error};
//!
//! fn classify(error: anyhow::Error) {
//!     match error.downcast_ref::<LauncherError>() {
//!         Some(LauncherError::Cancelled { .. }) => println!("cancelled by the user"),
//!         Some(other) => println!("launcher error: {other}"),
//!         None => user_friendly_error(error).display(),
//!     }
//! }
//! ```

use colored::Colorize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// The main error type for launcher update and install operations.
///
/// # Error Categories
///
/// ## Network
/// - [`TransportError`] - connection, TLS, or mid-stream read failures
/// - [`RemoteError`] - the server answered with a non-success status
///
/// ## Integrity
/// - [`ChecksumMismatch`] - a downloaded file does not match its expected digest
/// - [`ChecksumRequired`] - a trusted artifact was offered without a digest
///
/// ## Local system
/// - [`FileSystemError`] - directory creation, copy, or write failures
/// - [`Cancelled`] - the operation was aborted through its cancellation token
///
/// ## External tools
/// - [`PatchToolNotFound`] - the patch tool binary could not be located
/// - [`PatchToolError`] - the patch tool exited unsuccessfully
/// - [`HelperMissing`] - the update helper is not installed next to the launcher
/// - [`HelperLaunchError`] - the update helper could not be started
///
/// [`TransportError`]: LauncherError::TransportError
/// [`RemoteError`]: LauncherError::RemoteError
/// [`ChecksumMismatch`]: LauncherError::ChecksumMismatch
/// [`ChecksumRequired`]: LauncherError::ChecksumRequired
/// [`FileSystemError`]: LauncherError::FileSystemError
/// [`Cancelled`]: LauncherError::Cancelled
/// [`PatchToolNotFound`]: LauncherError::PatchToolNotFound
/// [`PatchToolError`]: LauncherError::PatchToolError
/// [`HelperMissing`]: LauncherError::HelperMissing
/// [`HelperLaunchError`]: LauncherError::HelperLaunchError
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LauncherError {
    /// The request could not be completed at the transport level.
    ///
    /// Covers DNS, connection, TLS and body-read failures, as well as a body that
    /// ended before the advertised size was received.
    #[error("Network transfer failed for {url}: {reason}")]
    TransportError {
        /// URL being fetched
        url: String,
        /// Underlying transport failure
        reason: String,
    },

    /// The server responded, but not with a 2xx status.
    #[error("Server returned HTTP {status} for {url}")]
    RemoteError {
        /// URL being fetched
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The operation was cancelled through its cancellation token.
    ///
    /// Kept distinct from transport and I/O failures so callers can treat a
    /// user-initiated abort differently from a genuine failure.
    #[error("Operation cancelled: {operation}")]
    Cancelled {
        /// The operation that was interrupted
        operation: String,
    },

    /// A file's SHA-256 digest did not match the expected value.
    #[error("Checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// File or artifact name
        name: String,
        /// Expected hex digest
        expected: String,
        /// Actual hex digest
        actual: String,
    },

    /// A trusted artifact was resolved without a checksum.
    #[error("Checksum required for {asset} but no usable SHA-256 digest was provided")]
    ChecksumRequired {
        /// Asset description (usually its URL)
        asset: String,
    },

    /// A local filesystem operation failed.
    #[error("File system error during {operation} on {path}: {reason}")]
    FileSystemError {
        /// Operation being performed (e.g. "creating staging directory")
        operation: String,
        /// Path involved
        path: String,
        /// Underlying cause
        reason: String,
    },

    /// The external patch tool could not be found.
    #[error("Patch tool '{tool}' not found")]
    PatchToolNotFound {
        /// Tool name or the path that was probed
        tool: String,
    },

    /// The external patch tool ran but did not succeed.
    ///
    /// `output` holds the tool's combined stdout/stderr verbatim.
    #[error("Patch tool failed ({exit_details})\nOutput:\n{output}")]
    PatchToolError {
        /// Exit status description
        exit_details: String,
        /// Captured combined output
        output: String,
    },

    /// The update helper is not present next to the running executable.
    #[error("Update helper not found at {path}")]
    HelperMissing {
        /// Expected helper location
        path: String,
    },

    /// The update helper exists but could not be started.
    #[error("Failed to start update helper {path}: {reason}")]
    HelperLaunchError {
        /// Helper location
        path: String,
        /// Spawn failure
        reason: String,
    },

    /// The release-metadata source could not resolve an asset.
    #[error("Failed to resolve release asset '{kind}': {reason}")]
    ReleaseLookupFailed {
        /// Asset kind being resolved
        kind: String,
        /// Why resolution failed
        reason: String,
    },

    /// Launcher configuration could not be read or written.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// Any other failure.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl LauncherError {
    /// Builds a [`LauncherError::FileSystemError`] from an I/O error.
    ///
    /// ```rust
    /// use hyprism::core::LauncherError;
    /// use std::path::Path;
    ///
    /// let io = std::io::Error::other("disk on fire");
    /// let err = LauncherError::file_system("creating staging directory", Path::new("/tmp/x"), &io);
    /// assert!(err.to_string().contains("creating staging directory"));
    /// ```
    pub fn file_system(operation: &str, path: &Path, source: &std::io::Error) -> Self {
        Self::FileSystemError {
            operation: operation.to_string(),
            path: path.display().to_string(),
            reason: source.to_string(),
        }
    }

    /// Builds a [`LauncherError::Cancelled`] for the named operation.
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Returns `true` when `error` wraps a [`LauncherError::Cancelled`].
    #[must_use]
    pub fn is_cancelled(error: &anyhow::Error) -> bool {
        matches!(error.downcast_ref::<Self>(), Some(Self::Cancelled { .. }))
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// When displayed, errors show:
/// 1. **Error**: the main message in red
/// 2. **Details**: extra context in yellow (optional)
/// 3. **Suggestion**: what to do about it in green (optional)
///
/// ```rust,no_run
/// use hyprism::core::{ErrorContext, LauncherError};
///
/// let context = ErrorContext::new(LauncherError::PatchToolNotFound {
///     tool: "butler".to_string(),
/// })
/// .with_suggestion("Install butler or pass --patch-tool")
/// .with_details("The patch tool is required to install game files");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying launcher error
    pub error: LauncherError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without details or suggestions.
    #[must_use]
    pub const fn new(error: LauncherError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`LauncherError`] anywhere in the context chain, common
/// [`std::io::Error`] kinds, and TOML parse failures. Anything else is rendered with
/// its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(launcher_error) = error.downcast_ref::<LauncherError>() {
        return create_error_context(launcher_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(LauncherError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                    reason: io_error.to_string(),
                })
                .with_suggestion("Check that the launcher directory is writable by your user")
                .with_details("The launcher could not read or write one of its files");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(LauncherError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                    reason: io_error.to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(LauncherError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Fix the syntax in config.toml or run 'hyprism config reset'");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(LauncherError::Other {
        message,
    })
}

fn create_error_context(error: LauncherError) -> ErrorContext {
    match &error {
        LauncherError::TransportError { .. } => ErrorContext::new(error)
            .with_suggestion("Check your internet connection and try again")
            .with_details("The download was interrupted before it completed"),

        LauncherError::RemoteError { status, .. } => {
            let suggestion = match status {
                404 => "The requested release file does not exist. It may have been withdrawn",
                403 | 429 => "The server is rate limiting requests. Wait a few minutes and retry",
                s if *s >= 500 => "The release server is having problems. Try again later",
                _ => "Retry the operation; if it keeps failing, report the URL above",
            };
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        LauncherError::Cancelled { .. } => ErrorContext::new(error)
            .with_details("No changes were made past the point of cancellation"),

        LauncherError::ChecksumMismatch { .. } => ErrorContext::new(error)
            .with_suggestion("Delete the cache directory and download again")
            .with_details("The downloaded file was corrupted in transit or has been tampered with"),

        LauncherError::ChecksumRequired { .. } => ErrorContext::new(error)
            .with_details("The update helper is executed with your privileges and must be verified before use"),

        LauncherError::FileSystemError { .. } => ErrorContext::new(error).with_suggestion(
            match cfg!(windows) {
                true => "Check free disk space and that the folder is not open in another program",
                false => "Check free disk space and directory permissions with 'ls -la'",
            },
        ),

        LauncherError::PatchToolNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Install butler into the launcher's butler directory, put it on PATH, or pass --patch-tool")
            .with_details("Game patches are applied by the external butler tool"),

        LauncherError::PatchToolError { .. } => ErrorContext::new(error)
            .with_suggestion("Check free disk space, then retry the installation")
            .with_details("The patch tool output above describes what went wrong"),

        LauncherError::HelperMissing { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'hyprism ensure-helper' to download the update helper"),

        LauncherError::HelperLaunchError { .. } => ErrorContext::new(error)
            .with_suggestion("Reinstall the update helper with 'hyprism ensure-helper'")
            .with_details("The running launcher was left untouched"),

        LauncherError::ReleaseLookupFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Check the release repository settings in config.toml"),

        LauncherError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Fix config.toml or run 'hyprism config reset'"),

        LauncherError::Other { .. } => ErrorContext::new(error),
    }
}
