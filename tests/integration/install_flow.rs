//! Patch application end to end, with a shell script playing the patch tool.
#![cfg(unix)]

use hyprism::core::{InstallStage, LauncherError, ProgressUpdate};
use hyprism::download::{Asset, Downloader};
use hyprism::install::{ApplyOutcome, GameInstaller, PatchApplier, PatchTool};
use hyprism::test_utils::{
    TestLayout, failing_patch_tool, fake_patch_tool, init_test_logging, sha256_hex,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PATCH: &[u8] = b"pretend this is a game patch";
const SHORT: Duration = Duration::from_millis(50);

fn applier(tool: &Path) -> PatchApplier {
    PatchApplier::new(PatchTool::at(tool)).with_cleanup_delays(SHORT, SHORT)
}

fn write_patch(env: &TestLayout, name: &str) -> std::path::PathBuf {
    let patch = env.layout.cache_dir().join(name);
    std::fs::create_dir_all(patch.parent().unwrap()).unwrap();
    std::fs::write(&patch, PATCH).unwrap();
    patch
}

async fn wait_until_gone(path: &Path) -> bool {
    for _ in 0..60 {
        if !path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_fresh_install_applies_patch() {
    init_test_logging(None);
    let env = TestLayout::new().unwrap();
    let tool = fake_patch_tool(&env.layout.butler_dir()).unwrap();
    let target = env.layout.game_dir("latest");
    let patch = write_patch(&env, "4.pwr");

    let updates = Arc::new(Mutex::new(Vec::<ProgressUpdate>::new()));
    let sink = {
        let updates = Arc::clone(&updates);
        move |u: &ProgressUpdate| updates.lock().unwrap().push(u.clone())
    };

    let outcome = applier(&tool)
        .apply(&patch, &target, Some(&sink), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, ApplyOutcome::Applied);
    assert_eq!(std::fs::read(env.marker(&target)).unwrap(), PATCH);
    assert!(!target.join("staging-temp").exists());
    assert!(wait_until_gone(&patch).await, "patch file was not cleaned up");

    let updates = updates.lock().unwrap();
    let stages: Vec<_> = updates.iter().map(|u| u.stage).collect();
    assert!(stages.windows(2).all(|w| w[0] <= w[1]), "stages out of order: {stages:?}");
    assert_eq!(stages.last(), Some(&InstallStage::Complete));

    let applying: Vec<f64> = updates
        .iter()
        .filter(|u| u.stage == InstallStage::Applying)
        .map(|u| u.percent)
        .collect();
    assert!(applying.contains(&12.5));
    assert!(applying.iter().all(|p| *p < 100.0));
}

#[tokio::test]
async fn test_second_apply_short_circuits() {
    let env = TestLayout::new().unwrap();
    let tool = fake_patch_tool(&env.layout.butler_dir()).unwrap();
    let target = env.layout.game_dir("latest");
    let cancel = CancellationToken::new();

    let first = write_patch(&env, "first.pwr");
    applier(&tool).apply(&first, &target, None, &cancel).await.unwrap();

    // A tool that would fail proves the second call never runs it.
    let broken = failing_patch_tool(&env.temp.path().join("broken"), "must not run").unwrap();
    let second = write_patch(&env, "second.pwr");
    let outcome = applier(&broken).apply(&second, &target, None, &cancel).await.unwrap();

    assert_eq!(outcome, ApplyOutcome::AlreadyInstalled);
    assert!(!target.join("staging-temp").exists());
    assert!(wait_until_gone(&second).await, "patch file was not scheduled for deletion");
}

#[tokio::test]
async fn test_tool_failure_reports_output() {
    let env = TestLayout::new().unwrap();
    let tool = failing_patch_tool(&env.layout.butler_dir(), "disk full").unwrap();
    let target = env.layout.game_dir("latest");
    let patch = write_patch(&env, "4.pwr");

    let err = applier(&tool)
        .apply(&patch, &target, None, &CancellationToken::new())
        .await
        .unwrap_err();

    match err.downcast_ref::<LauncherError>() {
        Some(LauncherError::PatchToolError {
            output,
            exit_details,
        }) => {
            assert!(output.contains("disk full"), "output was {output:?}");
            assert_eq!(exit_details, "exit code 1");
        }
        other => panic!("expected PatchToolError, got {other:?}"),
    }
    assert!(!target.join("staging-temp").exists());
    assert!(!env.marker(&target).exists());
}

#[tokio::test]
async fn test_installer_downloads_verifies_and_applies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/patches/4.pwr"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PATCH.to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let env = TestLayout::new().unwrap();
    let tool = fake_patch_tool(&env.layout.butler_dir()).unwrap();
    let target = env.layout.game_dir("4");
    let installer =
        GameInstaller::new(Downloader::new(env.layout.cache_dir()).unwrap(), applier(&tool));
    let asset = Asset::new(format!("{}/patches/4.pwr", server.uri())).with_checksum(sha256_hex(PATCH));
    let cancel = CancellationToken::new();

    let outcome = installer.install(&asset, &target, None, &cancel).await.unwrap();
    assert_eq!(outcome, ApplyOutcome::Applied);
    assert_eq!(std::fs::read(env.marker(&target)).unwrap(), PATCH);

    // Installed now: no second download.
    let outcome = installer.install(&asset, &target, None, &cancel).await.unwrap();
    assert_eq!(outcome, ApplyOutcome::AlreadyInstalled);
}

#[tokio::test]
async fn test_cancelled_tool_run_cleans_staging() {
    let env = TestLayout::new().unwrap();
    let tool = hyprism::test_utils::write_script(&env.layout.butler_dir(), "butler", "exec sleep 30").unwrap();
    let target = env.layout.game_dir("latest");
    let patch = write_patch(&env, "4.pwr");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let err = applier(&tool).apply(&patch, &target, None, &cancel).await.unwrap_err();

    assert!(LauncherError::is_cancelled(&err));
    assert!(!target.join("staging-temp").exists());
}
