use assert_cmd::prelude::*;
use mocks::{
    asset_json, dam_server, expect_asset, expect_asset_sequence, expect_field, expect_list,
    expect_metrics, expect_thumbnail_action,
};
use predicates::prelude::*;
use std::process::Command;
use tempfile::{tempdir, TempDir};

// The returned directory is HOME for the child process and must outlive it.
fn cli_command(api_url: &str) -> (Command, TempDir) {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("asset_cli").unwrap();
    cmd.env("MOCK_KEYRING", "1");
    cmd.env("ASSETDESK_API_TOKEN", "test-token");
    cmd.env("HOME", dir.path());
    cmd.env_remove("ASSETDESK_USE_FILE_STORE");
    cmd.args(["--api-url", api_url, "--log-level", "warn"]);
    (cmd, dir)
}

fn server_url(server: &httptest::Server) -> String {
    format!("http://{}", server.addr())
}

#[test]
fn test_help() {
    let (mut cmd, _home) = cli_command("http://127.0.0.1:9");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("AssetDesk"));
}

#[test]
fn test_list_assets() {
    let server = dam_server();
    expect_list(
        &server,
        vec![
            asset_json("a1", "image/jpeg", "completed"),
            asset_json("a2", "video/mp4", "processing"),
        ],
    );
    let (mut cmd, _home) = cli_command(&server_url(&server));
    cmd.arg("list-assets")
        .assert()
        .success()
        .stdout(predicate::str::contains("a1  asset-a1  completed  available"))
        .stdout(predicate::str::contains("a2  asset-a2  processing  pending"))
        .stdout(predicate::str::contains("Page 1 of 1 (2 assets)"));
}

#[test]
fn test_show_asset() {
    let server = dam_server();
    expect_asset(&server, "a1", asset_json("a1", "image/png", "completed"));
    let (mut cmd, _home) = cli_command(&server_url(&server));
    cmd.args(["show-asset", "a1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Thumbnail state: available"))
        .stdout(predicate::str::contains("https://cdn.test/a1/thumb.jpg"));
}

#[test]
fn test_retry_success() {
    let server = dam_server();
    expect_thumbnail_action(&server, "a1", "retry", 200);
    let (mut cmd, _home) = cli_command(&server_url(&server));
    cmd.args(["retry", "a1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Retry queued for a1"));
}

#[test]
fn test_generate_already_in_progress() {
    let server = dam_server();
    expect_thumbnail_action(&server, "a1", "generate", 409);
    let (mut cmd, _home) = cli_command(&server_url(&server));
    cmd.args(["generate", "a1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("AlreadyInProgress"));
}

#[test]
fn test_regenerate_styles_rejects_unknown_style() {
    let (mut cmd, _home) = cli_command("http://127.0.0.1:9");
    cmd.args(["regenerate-styles", "a1", "--style", "gigantic"])
        .assert()
        .failure();
}

#[test]
fn test_metrics() {
    let server = dam_server();
    expect_metrics(&server, "a1", 42, 7);
    let (mut cmd, _home) = cli_command(&server_url(&server));
    cmd.args(["metrics", "a1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Views: 42"))
        .stdout(predicate::str::contains("Downloads: 7"));
}

#[test]
fn test_watch_until_settled() {
    let server = dam_server();
    expect_asset_sequence(
        &server,
        "a1",
        vec![
            asset_json("a1", "image/jpeg", "processing"),
            asset_json("a1", "image/jpeg", "processing"),
            asset_json("a1", "image/jpeg", "completed"),
        ],
    );
    let (mut cmd, _home) = cli_command(&server_url(&server));
    cmd.args(["--poll-interval-ms", "10", "watch", "a1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Settled: available"));
}

#[test]
fn test_watch_settled_asset_does_not_poll() {
    let server = dam_server();
    expect_asset_sequence(&server, "a1", vec![asset_json("a1", "image/jpeg", "completed")]);
    let (mut cmd, _home) = cli_command(&server_url(&server));
    cmd.args(["watch", "a1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Settled: available"));
}

#[test]
fn test_show_field() {
    let server = dam_server();
    expect_field(&server, 5);
    let (mut cmd, _home) = cli_command(&server_url(&server));
    cmd.args(["show-field", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[x] Photos (id: 1) primary"))
        .stdout(predicate::str::contains("[ ] Logos (id: 2)"));
}

#[test]
fn test_set_field_categories_rejects_unknown_category() {
    let server = dam_server();
    expect_field(&server, 5);
    let (mut cmd, _home) = cli_command(&server_url(&server));
    cmd.args(["set-field-categories", "5", "--enable", "1,99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown category 99"));
}

#[test]
fn test_missing_token() {
    let (mut cmd, _home) = cli_command("http://127.0.0.1:9");
    cmd.env_remove("ASSETDESK_API_TOKEN");
    cmd.arg("list-assets")
        .assert()
        .failure()
        .stderr(predicate::str::contains("MissingToken"));
}

#[test]
fn test_login_logout_with_file_store() {
    let server = dam_server();
    expect_list(&server, vec![asset_json("a1", "image/jpeg", "completed")]);
    let url = server_url(&server);
    let home = tempdir().unwrap();
    let run = |args: &[&str]| {
        let mut cmd = Command::cargo_bin("asset_cli").unwrap();
        cmd.env("HOME", home.path());
        cmd.env("MOCK_KEYRING", "1");
        cmd.env_remove("ASSETDESK_API_TOKEN");
        cmd.args(["--api-url", url.as_str(), "--use-file-store"]);
        cmd.args(args);
        cmd.assert()
    };

    run(&["login", "--token", "secret-token"])
        .success()
        .stdout(predicate::str::contains("Token stored"));
    assert!(home.path().join(".assetdesk").join("tokens.json").exists());

    run(&["list-assets"]).success().stdout(predicate::str::contains("a1"));

    run(&["logout"]).success();
    run(&["list-assets"])
        .failure()
        .stderr(predicate::str::contains("MissingToken"));
}
