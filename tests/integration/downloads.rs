//! Downloader and checksum behaviour over real HTTP.

use hyprism::core::{InstallStage, LauncherError, ProgressUpdate};
use hyprism::download::{Asset, ChecksumVerifier, Downloader};
use hyprism::test_utils::{init_test_logging, sha256_hex};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_total() {
    init_test_logging(None);
    let body = payload(2 * 1024 * 1024);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/game/4.pwr"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let downloader = Downloader::new(temp.path()).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        move |update: &ProgressUpdate| {
            if let Some(transfer) = &update.transfer {
                seen.lock().unwrap().push(transfer.bytes_downloaded);
            }
        }
    };

    let asset = Asset::new(format!("{}/game/4.pwr", server.uri())).with_checksum(sha256_hex(&body));
    let file = downloader
        .fetch_verified(&asset, Some(&sink), &CancellationToken::new())
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {seen:?}");
    assert_eq!(*seen.last().unwrap(), body.len() as u64);
    assert_eq!(std::fs::read(file).unwrap(), body);
}

#[tokio::test]
async fn test_cancelled_download_leaves_nothing_behind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(payload(1024))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let downloader = Downloader::new(temp.path()).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let stages = Arc::clone(&stages);
        move |update: &ProgressUpdate| stages.lock().unwrap().push(update.stage)
    };
    let asset = Asset::new(format!("{}/slow.pwr", server.uri()));
    let err = downloader.fetch(&asset, Some(&sink), &cancel).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<LauncherError>(),
        Some(LauncherError::Cancelled { .. })
    ));
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    assert_eq!(stages.lock().unwrap().last(), Some(&InstallStage::Failed));
}

#[tokio::test]
async fn test_checksum_law_on_downloaded_file() {
    let body = payload(70_000);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let file = Downloader::new(temp.path())
        .unwrap()
        .fetch(&Asset::new(format!("{}/blob", server.uri())), None, &CancellationToken::new())
        .await
        .unwrap();

    let digest = ChecksumVerifier::compute_sha256(&file).await.unwrap();
    ChecksumVerifier::verify(&file, Some(digest.as_str())).await.unwrap();

    let mut flipped = hex::decode(&digest).unwrap();
    flipped[0] ^= 0x01;
    let flipped = hex::encode(flipped);
    let err = ChecksumVerifier::verify(&file, Some(flipped.as_str())).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LauncherError>(),
        Some(LauncherError::ChecksumMismatch { .. })
    ));
}

#[tokio::test]
async fn test_remote_and_transport_errors_are_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let downloader = Downloader::new(temp.path()).unwrap();
    let cancel = CancellationToken::new();

    let remote = downloader
        .fetch(&Asset::new(format!("{}/x", server.uri())), None, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        remote.downcast_ref::<LauncherError>(),
        Some(LauncherError::RemoteError { status: 500, .. })
    ));

    let transport =
        downloader.fetch(&Asset::new("http://127.0.0.1:9/x"), None, &cancel).await.unwrap_err();
    assert!(matches!(
        transport.downcast_ref::<LauncherError>(),
        Some(LauncherError::TransportError { .. })
    ));
}
