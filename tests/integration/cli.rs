use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Config file pointing every path into `root`.
fn write_config(root: &Path) -> std::path::PathBuf {
    let config = root.join("config.toml");
    std::fs::write(
        &config,
        format!(
            r#"
[paths]
plugins_dir = "{root}/plugins"
themes_dir = "{root}/themes"
backup_dir = "{root}/backups"
work_dir = "{root}/tmp"
registry = "{root}/repositories.json"
"#,
            root = root.display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();
    config
}

fn github_push(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("github-push").unwrap();
    cmd.env("GITHUB_PUSH_CONFIG", config).env_remove("GITHUB_TOKEN").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("github-push")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("test-connection"));
}

#[test]
fn test_list_empty_registry() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    github_push(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No repositories tracked"));
}

#[test]
fn test_add_edit_remove_round() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    github_push(&config)
        .args(["add", "--owner", "acme", "--repo", "widget", "--path", "widget", "--skip-verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/widget as #1"));

    github_push(&config)
        .args(["edit", "1", "--releases", "true", "--auto-update", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("releases"));

    github_push(&config)
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"use_releases\": true"));

    github_push(&config)
        .args(["remove", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("files left in place"));

    github_push(&config).arg("list").assert().success().stdout(predicate::str::contains("No repositories"));
}

#[test]
fn test_rejects_path_outside_root() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    github_push(&config)
        .args(["add", "--owner", "acme", "--repo", "widget", "--path", "../../etc", "--skip-verify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_unknown_item_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    github_push(&config).args(["update", "7"]).assert().failure().code(1);
}

#[test]
fn test_config_flag_overrides_environment() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    Command::cargo_bin("github-push")
        .unwrap()
        .env("GITHUB_PUSH_CONFIG", temp.path().join("missing.toml"))
        .args(["--config", config.to_str().unwrap(), "list"])
        .assert()
        .success();
}
