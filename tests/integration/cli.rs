//! The `hyprism` binary, run against an isolated application directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn hyprism(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hyprism").unwrap();
    cmd.env("HYPRISM_HOME", home.path())
        .env("HYPRISM_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .env_remove("HYPRISM_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_paths_lists_layout() {
    let home = TempDir::new().unwrap();
    let game_dir = home.path().join("release").join("package").join("game").join("latest");

    hyprism(&home)
        .arg("paths")
        .assert()
        .success()
        .stdout(predicate::str::contains(home.path().to_string_lossy().as_ref()))
        .stdout(predicate::str::contains(game_dir.to_string_lossy().as_ref()));
}

#[test]
fn test_config_path_reset_and_show() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("config.toml");

    hyprism(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(config_path.to_string_lossy().as_ref()));

    hyprism(&home).args(["config", "reset"]).assert().success();
    assert!(config_path.is_file());

    hyprism(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nick = \"Steven\""))
        .stdout(predicate::str::contains("[updates]"));
}

#[test]
fn test_explicit_config_flag_wins() {
    let home = TempDir::new().unwrap();
    let custom = home.path().join("elsewhere.toml");
    std::fs::write(&custom, "nick = \"Trork\"\n").unwrap();

    hyprism(&home)
        .arg("--config")
        .arg(&custom)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("nick = \"Trork\""));
}

#[test]
fn test_malformed_config_fails_with_hint() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("config.toml"), "max_memory = \"lots\"").unwrap();

    hyprism(&home)
        .arg("paths")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("hyprism config reset"));
}

#[test]
fn test_install_without_patch_tool_fails_before_download() {
    let home = TempDir::new().unwrap();
    let empty_path = TempDir::new().unwrap();

    hyprism(&home)
        .env("PATH", empty_path.path())
        .args(["install", "--url", "http://127.0.0.1:9/4.pwr"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    assert!(!home.path().join("release").exists());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_install_end_to_end() {
    use hyprism::test_utils::{fake_patch_tool, sha256_hex};
    use hyprism::utils::PlatformProfile;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let patch = b"patch bytes".to_vec();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(patch.clone()))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    fake_patch_tool(&home.path().join("butler")).unwrap();
    let url = format!("{}/patches/4.pwr", server.uri());
    let digest = sha256_hex(&patch);

    let assert = tokio::task::spawn_blocking(move || {
        let result = hyprism(&home)
            .args(["install", "--url", &url, "--sha256", &digest, "--version", "4"])
            .assert();
        (home, result)
    })
    .await
    .unwrap();
    let (home, assert) = assert;
    assert.success().stdout(predicate::str::contains("Game installed"));

    let game_dir = home.path().join("release").join("package").join("game").join("4");
    assert!(PlatformProfile::current().marker_path(&game_dir).is_file());
    assert!(!game_dir.join("staging-temp").exists());
}
