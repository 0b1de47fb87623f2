use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::core::LauncherError;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Verifies the integrity of downloaded files using SHA-256.
///
/// Digests are computed by streaming the file through the hasher, so arbitrarily
/// large patch artifacts never have to fit in memory.
///
/// Expected digests are compared case-insensitively and may carry an optional
/// `sha256:` prefix.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Compute the lowercase hex SHA-256 digest of a file.
    ///
    /// ```rust,no_run
    /// use hyprism::download::verification::ChecksumVerifier;
    /// use std::path::Path;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let digest = ChecksumVerifier::compute_sha256(Path::new("/path/to/patch.pwr")).await?;
    /// println!("SHA256: {digest}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compute_sha256(file_path: &Path) -> Result<String> {
        debug!("Computing SHA256 checksum for: {}", file_path.display());

        let mut file = tokio::fs::File::open(file_path)
            .await
            .map_err(|e| LauncherError::file_system("opening file for checksum", file_path, &e))?;

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|e| LauncherError::file_system("reading file for checksum", file_path, &e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Verify a file against an expected digest.
    ///
    /// A missing expectation skips verification and succeeds; callers that require
    /// verification must check for a digest before calling.
    ///
    /// # Errors
    ///
    /// - [`LauncherError::ChecksumRequired`] when `expected` is not a SHA-256 hex digest
    /// - [`LauncherError::ChecksumMismatch`] when the digests differ
    pub async fn verify(file_path: &Path, expected: Option<&str>) -> Result<()> {
        let Some(expected) = expected else {
            debug!("No checksum supplied for {}, skipping verification", file_path.display());
            return Ok(());
        };
        let expected = normalize_digest(expected).to_ascii_lowercase();
        if !is_sha256_hex(&expected) {
            return Err(LauncherError::ChecksumRequired {
                asset: file_path.display().to_string(),
            }
            .into());
        }

        info!("Verifying checksum for: {}", file_path.display());
        let actual = Self::compute_sha256(file_path).await?;

        if actual != expected {
            return Err(LauncherError::ChecksumMismatch {
                name: file_path
                    .file_name()
                    .map_or_else(|| file_path.display().to_string(), |n| n.to_string_lossy().into_owned()),
                expected,
                actual,
            }
            .into());
        }

        info!("Checksum verification successful");
        Ok(())
    }

    /// Finds the digest for `file_name` in a `checksums.txt` style listing.
    ///
    /// Expected format (one per line, `sha256sum` output):
    /// ```text
    /// abc123def456...  update-helper-linux-x86_64
    /// 789ghi012jkl...  *hyprism-windows-x86_64.exe
    /// ```
    #[must_use]
    pub fn find_in_listing(listing: &str, file_name: &str) -> Option<String> {
        listing.lines().find_map(|line| {
            let mut parts = line.split_whitespace();
            let digest = parts.next()?;
            let name = parts.next()?.trim_start_matches('*');
            let base = name.rsplit('/').next().unwrap_or(name);
            (base == file_name).then(|| normalize_digest(digest).to_ascii_lowercase())
        })
    }
}

/// Strips surrounding whitespace and an optional `sha256:` prefix.
#[must_use]
pub fn normalize_digest(digest: &str) -> &str {
    let digest = digest.trim();
    let digest = match digest.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("sha256:") => &digest[7..],
        _ => digest,
    };
    digest.trim()
}

/// Whether `digest` is exactly 64 hex characters.
#[must_use]
pub fn is_sha256_hex(digest: &str) -> bool {
    digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit())
}
