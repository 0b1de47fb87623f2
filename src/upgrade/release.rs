//! Release-metadata sources
//!
//! A [`ReleaseSource`] turns an [`AssetKind`] into a downloadable [`Asset`]. The
//! updater treats it as an opaque lookup; it never interprets release notes or
//! tags itself.
//!
//! [`GitHubReleaseSource`] reads the latest release of a GitHub repository:
//!
//! ```text
//! GET {api_base}/repos/{owner}/{repo}/releases/latest
//! ```
//!
//! and picks the asset built for the running platform, e.g.
//! `update-helper-linux-x86_64` or `hyprism-windows-x86_64.exe`. Digests come from
//! the asset's own `digest` field when GitHub provides one, otherwise from a
//! `checksums.txt` asset in `sha256sum` format.

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

use crate::core::LauncherError;
use crate::download::{Asset, ChecksumVerifier, http_client};
use crate::utils::platform::{HELPER_BASE_NAME, PlatformProfile};

/// Default GitHub API endpoint.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Names of checksum listings looked for in a release, in order of preference.
const CHECKSUM_LISTINGS: [&str; 2] = ["checksums.txt", "SHA256SUMS"];

/// Artifacts the updater knows how to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// The self-update helper executable.
    UpdateHelper,
    /// A replacement launcher executable.
    Launcher,
}

impl AssetKind {
    /// Base name of release assets of this kind.
    #[must_use]
    pub const fn base_name(self) -> &'static str {
        match self {
            Self::UpdateHelper => HELPER_BASE_NAME,
            Self::Launcher => "hyprism",
        }
    }

    /// Release asset name for the running platform.
    #[must_use]
    pub fn platform_asset_name(self) -> String {
        PlatformProfile::current().release_asset_name(self.base_name())
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

/// Resolves downloadable assets.
pub trait ReleaseSource: Send + Sync {
    /// Returns the asset of `kind` for the running platform.
    ///
    /// # Errors
    ///
    /// [`LauncherError::ReleaseLookupFailed`] when the source has no such asset.
    fn get_asset(&self, kind: AssetKind) -> impl Future<Output = Result<Asset>> + Send;
}

/// Pre-resolved assets held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticReleaseSource {
    assets: HashMap<AssetKind, Asset>,
}

impl StaticReleaseSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_asset(mut self, kind: AssetKind, asset: Asset) -> Self {
        self.assets.insert(kind, asset);
        self
    }
}

impl ReleaseSource for StaticReleaseSource {
    async fn get_asset(&self, kind: AssetKind) -> Result<Asset> {
        self.assets.get(&kind).cloned().ok_or_else(|| {
            LauncherError::ReleaseLookupFailed {
                kind: kind.to_string(),
                reason: "no asset configured".to_string(),
            }
            .into()
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GitHubAsset>,
}

#[derive(Debug, Clone, Deserialize)]
struct GitHubAsset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    digest: Option<String>,
}

/// Latest release of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Version from the release tag, without a leading `v`.
    pub version: String,
}

impl ReleaseInfo {
    /// Whether this release is newer than `current` (semver comparison).
    ///
    /// Unparseable versions are never considered newer.
    #[must_use]
    pub fn is_newer_than(&self, current: &str) -> bool {
        match (semver::Version::parse(&self.version), semver::Version::parse(current)) {
            (Ok(latest), Ok(current)) => latest > current,
            _ => false,
        }
    }
}

/// [`ReleaseSource`] backed by the GitHub releases API.
#[derive(Debug, Clone)]
pub struct GitHubReleaseSource {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
}

impl GitHubReleaseSource {
    /// Source for `owner/repo` on github.com.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_base: GITHUB_API_BASE.to_string(),
            owner: owner.into(),
            repo: repo.into(),
        })
    }

    /// Points the source at a different API endpoint (mock servers, mirrors).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Version of the latest release.
    pub async fn latest_release(&self) -> Result<ReleaseInfo> {
        let release = self.fetch_latest(AssetKind::Launcher).await?;
        Ok(ReleaseInfo {
            version: release.tag_name.trim_start_matches('v').to_string(),
        })
    }

    fn latest_url(&self) -> String {
        format!("{}/repos/{}/{}/releases/latest", self.api_base, self.owner, self.repo)
    }

    async fn fetch_latest(&self, kind: AssetKind) -> Result<GitHubRelease> {
        let url = self.latest_url();
        debug!("Fetching release metadata from {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| LauncherError::TransportError {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(LauncherError::RemoteError {
                url,
                status: response.status().as_u16(),
            }
            .into());
        }

        response.json::<GitHubRelease>().await.map_err(|e| {
            LauncherError::ReleaseLookupFailed {
                kind: kind.to_string(),
                reason: format!("invalid release metadata: {e}"),
            }
            .into()
        })
    }

    async fn fetch_listing(&self, release: &GitHubRelease) -> Option<String> {
        let listing = CHECKSUM_LISTINGS
            .iter()
            .find_map(|name| release.assets.iter().find(|a| a.name == *name))?;

        let response = match self.client.get(&listing.browser_download_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("Failed to fetch {}: HTTP {}", listing.name, response.status());
                return None;
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", listing.name, e);
                return None;
            }
        };
        response.text().await.ok()
    }
}

impl ReleaseSource for GitHubReleaseSource {
    async fn get_asset(&self, kind: AssetKind) -> Result<Asset> {
        let release = self.fetch_latest(kind).await?;
        let wanted = kind.platform_asset_name();

        let Some(found) = release.assets.iter().find(|a| a.name == wanted) else {
            return Err(LauncherError::ReleaseLookupFailed {
                kind: kind.to_string(),
                reason: format!("release {} has no asset named {wanted}", release.tag_name),
            }
            .into());
        };

        let mut asset = Asset::new(&found.browser_download_url);
        asset.size = found.size;

        if let Some(digest) = found.digest.as_deref().and_then(|d| d.strip_prefix("sha256:")) {
            asset.checksum_sha256 = Some(digest.to_ascii_lowercase());
        } else if let Some(listing) = self.fetch_listing(&release).await {
            asset.checksum_sha256 = ChecksumVerifier::find_in_listing(&listing, &wanted);
        }

        if asset.checksum().is_none() {
            warn!("Release {} publishes no checksum for {}", release.tag_name, wanted);
        }
        debug!("Resolved {} to {}", kind, asset.url);
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_release(server: &MockServer, assets: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/repos/hyprism/hyprism/releases/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tag_name": "v1.4.0",
                "assets": assets,
            })))
            .mount(server)
            .await;
    }

    fn source(server: &MockServer) -> GitHubReleaseSource {
        GitHubReleaseSource::new("hyprism", "hyprism").unwrap().with_api_base(server.uri())
    }

    #[tokio::test]
    async fn test_resolves_platform_asset_with_listing_checksum() {
        let server = MockServer::start().await;
        let helper = AssetKind::UpdateHelper.platform_asset_name();
        mount_release(
            &server,
            json!([
                {"name": helper, "browser_download_url": format!("{}/dl/helper", server.uri()), "size": 12},
                {"name": "checksums.txt", "browser_download_url": format!("{}/dl/checksums.txt", server.uri())},
            ]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/dl/checksums.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("ABCDEF  {helper}\n")))
            .mount(&server)
            .await;

        let asset = source(&server).get_asset(AssetKind::UpdateHelper).await.unwrap();

        assert_eq!(asset.url, format!("{}/dl/helper", server.uri()));
        assert_eq!(asset.size, Some(12));
        assert_eq!(asset.checksum(), Some("abcdef"));
    }

    #[tokio::test]
    async fn test_prefers_asset_digest_field() {
        let server = MockServer::start().await;
        let launcher = AssetKind::Launcher.platform_asset_name();
        mount_release(
            &server,
            json!([{"name": launcher, "browser_download_url": "https://example.com/l", "digest": "sha256:FEED"}]),
        )
        .await;

        let asset = source(&server).get_asset(AssetKind::Launcher).await.unwrap();
        assert_eq!(asset.checksum(), Some("feed"));
    }

    #[tokio::test]
    async fn test_missing_asset_fails_lookup() {
        let server = MockServer::start().await;
        mount_release(&server, json!([])).await;

        let err = source(&server).get_asset(AssetKind::UpdateHelper).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::ReleaseLookupFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_latest_release_version() {
        let server = MockServer::start().await;
        mount_release(&server, json!([])).await;

        let release = source(&server).latest_release().await.unwrap();
        assert_eq!(release.version, "1.4.0");
        assert!(release.is_newer_than("1.3.9"));
        assert!(!release.is_newer_than("1.4.0"));
        assert!(!release.is_newer_than("not-a-version"));
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticReleaseSource::new()
            .with_asset(AssetKind::Launcher, Asset::new("https://example.com/l"));

        assert!(source.get_asset(AssetKind::Launcher).await.is_ok());
        assert!(source.get_asset(AssetKind::UpdateHelper).await.is_err());
    }
}
