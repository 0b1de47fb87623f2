//! Helper provisioning against a mocked GitHub release, and the real hand-off.

use hyprism::core::LauncherError;
use hyprism::download::Downloader;
use hyprism::test_utils::{TestLayout, sha256_hex};
use hyprism::upgrade::{AssetKind, GitHubReleaseSource, HelperProvisioner};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HELPER: &[u8] = b"#!/bin/sh\nexit 0\n";

async fn release_server(digest: Option<String>) -> MockServer {
    let server = MockServer::start().await;
    let mut asset = json!({
        "name": AssetKind::UpdateHelper.platform_asset_name(),
        "browser_download_url": format!("{}/download/helper", server.uri()),
        "size": HELPER.len(),
    });
    if let Some(digest) = digest {
        asset["digest"] = json!(format!("sha256:{digest}"));
    }

    Mock::given(method("GET"))
        .and(path("/repos/hyprism/hyprism/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "v9.9.9",
            "assets": [asset],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/helper"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(HELPER.to_vec()))
        .mount(&server)
        .await;
    server
}

fn provisioner(server: &MockServer, env: &TestLayout) -> HelperProvisioner<GitHubReleaseSource> {
    let source = GitHubReleaseSource::new("hyprism", "hyprism").unwrap().with_api_base(server.uri());
    HelperProvisioner::new(source, Downloader::new(env.layout.cache_dir()).unwrap())
        .with_install_dir(env.temp.path().join("bin"))
}

#[tokio::test]
async fn test_helper_installed_from_release() {
    let server = release_server(Some(sha256_hex(HELPER))).await;
    let env = TestLayout::new().unwrap();

    let helper = provisioner(&server, &env).ensure_helper(&CancellationToken::new()).await.unwrap();

    assert_eq!(std::fs::read(&helper).unwrap(), HELPER);
    let again = provisioner(&server, &env).ensure_helper(&CancellationToken::new()).await.unwrap();
    assert_eq!(again, helper);
}

#[tokio::test]
async fn test_helper_digest_mismatch_leaves_no_helper() {
    let server = release_server(Some("f".repeat(64))).await;
    let env = TestLayout::new().unwrap();
    let provisioner = provisioner(&server, &env);

    let err = provisioner.ensure_helper(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<LauncherError>(),
        Some(LauncherError::ChecksumMismatch { .. })
    ));
    assert!(!provisioner.locate().unwrap().path.exists());
}

#[tokio::test]
async fn test_helper_without_checksum_is_refused() {
    let server = release_server(None).await;
    let env = TestLayout::new().unwrap();
    let provisioner = provisioner(&server, &env);

    let err = provisioner.ensure_helper(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<LauncherError>(),
        Some(LauncherError::ChecksumRequired { .. })
    ));
    assert!(!provisioner.locate().unwrap().path.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_handoff_starts_helper_with_both_paths() {
    use hyprism::test_utils::write_script;
    use hyprism::upgrade::SelfUpdateOrchestrator;
    use std::time::Duration;

    let env = TestLayout::new().unwrap();
    let bin = env.temp.path().join("bin");
    let record = env.temp.path().join("handoff.txt");
    write_script(&bin, "update-helper", &format!("echo \"$1|$2\" > '{}'", record.display())).unwrap();
    let exe = bin.join("hyprism");
    std::fs::write(&exe, b"old").unwrap();
    let staged = env.temp.path().join("hyprism.new");
    std::fs::write(&staged, b"new").unwrap();

    let handoff = SelfUpdateOrchestrator::new().with_executable(&exe).launch_helper(&staged).unwrap();
    assert!(handoff.pid > 0);

    let mut recorded = String::new();
    for _ in 0..60 {
        if let Ok(content) = std::fs::read_to_string(&record)
            && !content.is_empty()
        {
            recorded = content;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(recorded.trim(), format!("{}|{}", exe.display(), staged.display()));
}
