//! Streaming artifact downloads
//!
//! [`Downloader::fetch`] streams a remote [`Asset`] into a temporary file inside a
//! download directory (normally the launcher's `cache/`), reporting
//! [`DownloadProgress`] snapshots at a bounded rate.
//!
//! # Guarantees
//!
//! - The body is written chunk by chunk; the payload is never buffered whole
//! - Progress is emitted at most every [`PROGRESS_INTERVAL`], plus one final
//!   snapshot whose `bytes_downloaded` equals `bytes_total` when the size is known
//! - Cancellation removes the partial file and fails with
//!   [`LauncherError::Cancelled`], never with a transport error
//! - Non-2xx responses fail with [`LauncherError::RemoteError`]; connection and
//!   body failures with [`LauncherError::TransportError`]. Nothing is retried here
//!
//! [`PROGRESS_INTERVAL`]: crate::constants::PROGRESS_INTERVAL

pub mod asset;
pub mod verification;

pub use asset::Asset;
pub use verification::ChecksumVerifier;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::{HTTP_CONNECT_TIMEOUT, PROGRESS_INTERVAL, USER_AGENT};
use crate::core::{
    DownloadProgress, InstallStage, LauncherError, ProgressCallback, ProgressUpdate, StageTracker,
};
use crate::utils::fs::{FileGuard, ensure_dir};

/// Builds the HTTP client shared by the downloader and the metadata sources.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .build()
        .map_err(|e| {
            LauncherError::Other {
                message: format!("Failed to initialise HTTP client: {e}"),
            }
            .into()
        })
}

/// Fetches remote assets into local temporary files.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    download_dir: PathBuf,
}

impl Downloader {
    /// Creates a downloader writing into `download_dir`.
    pub fn new(download_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_client(http_client()?, download_dir))
    }

    /// Creates a downloader around an existing client.
    pub fn with_client(client: reqwest::Client, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            download_dir: download_dir.into(),
        }
    }

    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Downloads `asset` and returns the path of the local temp file.
    ///
    /// The caller owns the returned file and is responsible for removing it.
    pub async fn fetch(
        &self,
        asset: &Asset,
        on_progress: Option<&ProgressCallback<'_>>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let mut tracker = StageTracker::new(on_progress);
        let result = self.fetch_inner(asset, &mut tracker, cancel).await;
        if let Err(e) = &result {
            tracker.fail(e.to_string());
        }
        result
    }

    /// Downloads `asset` and verifies it against its checksum, if it has one.
    ///
    /// The temp file is removed when verification fails.
    pub async fn fetch_verified(
        &self,
        asset: &Asset,
        on_progress: Option<&ProgressCallback<'_>>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let mut tracker = StageTracker::new(on_progress);
        let result: Result<PathBuf> = async {
            let path = self.fetch_inner(asset, &mut tracker, cancel).await?;
            let guard = FileGuard::new(path);

            tracker.enter(InstallStage::Verifying, 0.0, format!("Verifying {}", asset.file_name()));
            ChecksumVerifier::verify(guard.path(), asset.checksum()).await?;
            tracker.enter(InstallStage::Verifying, 100.0, "Checksum verified");

            Ok(guard.keep())
        }
        .await;

        if let Err(e) = &result {
            tracker.fail(e.to_string());
        }
        result
    }

    async fn fetch_inner(
        &self,
        asset: &Asset,
        tracker: &mut StageTracker<'_>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let url = asset.url.as_str();
        let file_name = asset.file_name();
        let cancelled = || LauncherError::cancelled(format!("downloading {file_name}"));

        if cancel.is_cancelled() {
            return Err(cancelled().into());
        }

        ensure_dir(&self.download_dir, "creating download directory")?;
        info!("Downloading {} to {}", url, self.download_dir.display());

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled().into()),
            response = self.client.get(url).send() => response.map_err(|e| transport_error(url, &e))?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::RemoteError {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let content_length = response.content_length();
        let total = content_length.or(asset.size).unwrap_or(0);
        debug!("Response for {} advertises {} bytes", url, total);

        let temp_path =
            self.download_dir.join(format!(".{}-{}.part", uuid::Uuid::new_v4().simple(), file_name));
        let guard = FileGuard::new(&temp_path);

        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| LauncherError::file_system("creating download file", &temp_path, &e))?;

        tracker.emit(snapshot(0, total, 0.0, &file_name));

        let mut response = response;
        let mut downloaded: u64 = 0;
        let mut last_emit = Instant::now();
        let mut bytes_at_last_emit: u64 = 0;

        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("Download of {} cancelled after {} bytes", file_name, downloaded);
                    return Err(cancelled().into());
                }
                chunk = response.chunk() => chunk.map_err(|e| transport_error(url, &e))?,
            };

            let Some(chunk) = chunk else {
                break;
            };

            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::file_system("writing download file", &temp_path, &e))?;
            downloaded += chunk.len() as u64;

            let elapsed = last_emit.elapsed();
            if elapsed >= PROGRESS_INTERVAL {
                let rate = (downloaded - bytes_at_last_emit) as f64 / elapsed.as_secs_f64();
                tracker.emit(snapshot(downloaded, total, rate, &file_name));
                last_emit = Instant::now();
                bytes_at_last_emit = downloaded;
            }
        }

        file.flush()
            .await
            .map_err(|e| LauncherError::file_system("flushing download file", &temp_path, &e))?;
        drop(file);

        if let Some(expected) = content_length.filter(|&expected| downloaded < expected) {
            return Err(LauncherError::TransportError {
                url: url.to_string(),
                reason: format!("body ended after {downloaded} of {expected} bytes"),
            }
            .into());
        }

        let elapsed = last_emit.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 { (downloaded - bytes_at_last_emit) as f64 / elapsed } else { 0.0 };
        if content_length.is_none()
            && let Some(advertised) = asset.size.filter(|&size| size != downloaded)
        {
            warn!("{} was advertised as {} bytes but {} arrived", file_name, advertised, downloaded);
        }
        // The last snapshot always reports what actually arrived as the total.
        let final_total = if total == 0 { 0 } else { downloaded };
        tracker.emit(snapshot(downloaded, final_total, rate, &file_name));

        let final_path =
            self.download_dir.join(format!("{}-{}", uuid::Uuid::new_v4().simple(), file_name));
        tokio::fs::rename(guard.path(), &final_path)
            .await
            .map_err(|e| LauncherError::file_system("finalizing download", &final_path, &e))?;
        guard.keep();

        info!("Downloaded {} ({} bytes)", file_name, downloaded);
        Ok(final_path)
    }
}

fn snapshot(downloaded: u64, total: u64, rate: f64, file_name: &str) -> ProgressUpdate {
    let transfer = DownloadProgress {
        bytes_downloaded: downloaded,
        bytes_total: total,
        rate_bytes_per_sec: rate,
        current_file_name: file_name.to_string(),
    };
    ProgressUpdate {
        stage: InstallStage::Downloading,
        percent: transfer.percent().unwrap_or(0.0),
        message: format!("Downloading {file_name}"),
        transfer: Some(transfer),
    }
}

fn transport_error(url: &str, error: &reqwest::Error) -> anyhow::Error {
    LauncherError::TransportError {
        url: url.to_string(),
        reason: error.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(true)
    }

    #[tokio::test]
    async fn test_fetch_writes_body_and_reports_final_total() {
        let server = MockServer::start().await;
        let body = vec![42u8; 256 * 1024];
        Mock::given(method("GET"))
            .and(path("/game/5.pwr"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let downloader = Downloader::new(temp.path().join("cache")).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |u: &ProgressUpdate| {
                if let Some(t) = &u.transfer {
                    seen.lock().unwrap().push((t.bytes_downloaded, t.bytes_total));
                }
            }
        };

        let asset = Asset::new(format!("{}/game/5.pwr", server.uri()));
        let path = downloader.fetch(&asset, Some(&sink), &CancellationToken::new()).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), body);
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("5.pwr"));

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0), "bytes must be non-decreasing");
        assert_eq!(seen.last().copied(), Some((body.len() as u64, body.len() as u64)));
    }

    #[tokio::test]
    async fn test_final_total_matches_body_when_only_asset_size_is_known() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        // No Content-Length: the body is delimited by closing the connection.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nhello")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let temp = TempDir::new().unwrap();
        let downloader = Downloader::new(temp.path()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |u: &ProgressUpdate| {
                if let Some(t) = &u.transfer {
                    seen.lock().unwrap().push((t.bytes_downloaded, t.bytes_total));
                }
            }
        };

        let asset = Asset::new(format!("http://{addr}/short.pwr")).with_size(100);
        let path = downloader.fetch(&asset, Some(&sink), &CancellationToken::new()).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.first().copied(), Some((0, 100)));
        assert_eq!(seen.last().copied(), Some((5, 5)));
    }

    #[tokio::test]
    async fn test_non_success_status_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let downloader = Downloader::new(temp.path()).unwrap();
        let asset = Asset::new(format!("{}/missing.pwr", server.uri()));

        let err = downloader.fetch(&asset, None, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::RemoteError { status: 404, .. })
        ));
        assert!(dir_is_empty(temp.path()));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let temp = TempDir::new().unwrap();
        let downloader = Downloader::new(temp.path()).unwrap();
        let asset = Asset::new("http://127.0.0.1:9/unreachable.pwr");

        let err = downloader.fetch(&asset, None, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::TransportError { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancellation_leaves_no_partial_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 1024])
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let downloader = Downloader::new(temp.path()).unwrap();
        let asset = Asset::new(format!("{}/slow.pwr", server.uri()));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = downloader.fetch(&asset, None, &cancel).await.unwrap_err();
        assert!(LauncherError::is_cancelled(&err));
        assert!(dir_is_empty(temp.path()));
    }

    #[tokio::test]
    async fn test_fetch_verified_removes_file_on_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let downloader = Downloader::new(temp.path()).unwrap();
        let asset = Asset::new(format!("{}/p.pwr", server.uri())).with_checksum("00".repeat(32));

        let err =
            downloader.fetch_verified(&asset, None, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LauncherError>(),
            Some(LauncherError::ChecksumMismatch { .. })
        ));
        assert!(dir_is_empty(temp.path()));
    }
}
