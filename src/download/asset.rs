//! Downloadable artifact descriptors.

use serde::{Deserialize, Serialize};

use super::verification::{is_sha256_hex, normalize_digest};

/// A downloadable artifact resolved by a release-metadata source.
///
/// Immutable once resolved; the downloader only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Where to fetch the artifact from.
    pub url: String,
    /// Expected lowercase hex SHA-256 digest, if the source publishes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_sha256: Option<String>,
    /// Advertised size in bytes, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Asset {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            checksum_sha256: None,
            size: None,
        }
    }

    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum_sha256 = Some(checksum.into());
        self
    }

    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// The checksum without any `sha256:` prefix, treating an empty digest as absent.
    #[must_use]
    pub fn checksum(&self) -> Option<&str> {
        self.checksum_sha256.as_deref().map(normalize_digest).filter(|c| !c.is_empty())
    }

    /// The checksum, but only when it is a well-formed SHA-256 hex digest.
    ///
    /// Artifacts that must be verified gate on this rather than [`Asset::checksum`].
    #[must_use]
    pub fn sha256(&self) -> Option<&str> {
        self.checksum().filter(|c| is_sha256_hex(c))
    }

    /// Last path segment of the URL, without query string.
    ///
    /// ```rust
    /// use hyprism::download::Asset;
    ///
    /// let asset = Asset::new("https://cdn.example.com/patches/0/5.pwr?sig=abc");
    /// assert_eq!(asset.file_name(), "5.pwr");
    /// ```
    #[must_use]
    pub fn file_name(&self) -> String {
        let without_query = self.url.split(['?', '#']).next().unwrap_or(&self.url);
        without_query
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("download")
            .to_string()
    }
}
