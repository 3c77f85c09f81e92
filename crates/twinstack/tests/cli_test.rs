#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// 一時ディレクトリで実行する `twin`（グローバル設定を拾わないようにする）
fn twin(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("twin").unwrap();
    cmd.current_dir(dir)
        .env_remove("TWINSTACK_CONFIG_PATH")
        .env_remove("TWINSTACK_TASKS_URL")
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("NO_COLOR", "1");
    cmd
}

/// `twin init` 済みの一時ディレクトリ
fn initialized_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    twin(dir.path()).arg("init").assert().success();
    dir
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("twin").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ふたつのリージョンを、ひとつの定義で。"))
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("down"))
        .stdout(predicate::str::contains("tasks"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("twin").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("twinstack"));
}

/// upコマンドのヘルプが正しく表示されることを確認
#[test]
fn test_up_help() {
    let mut cmd = Command::cargo_bin("twin").unwrap();
    cmd.arg("up")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"))
        .stdout(predicate::str::contains("--only"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("twin").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

/// 不正な --only の値はエラー
#[test]
fn test_up_rejects_unknown_role() {
    let dir = initialized_project();
    twin(dir.path())
        .args(["up", "--only", "cache"])
        .assert()
        .failure();
}

/// 定義ファイルのないディレクトリで validate はエラー
#[test]
fn test_validate_without_deployment_file() {
    let dir = tempfile::tempdir().unwrap();
    twin(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("twin init"));
}

/// init で作ったひな形はそのまま validate を通る
#[test]
fn test_init_then_validate() {
    let dir = initialized_project();
    assert!(dir.path().join("twinstack.kdl").exists());
    assert!(dir.path().join("scripts/app.sh").exists());

    twin(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("設定ファイルは正常です"))
        .stdout(predicate::str::contains("us-east-2"))
        .stdout(predicate::str::contains("twinstack-lb"));
}

/// 2回目の init は --force なしでは失敗する
#[test]
fn test_init_twice_requires_force() {
    let dir = initialized_project();
    twin(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    twin(dir.path()).args(["init", "--force"]).assert().success();
}

/// 不正な定義は validate でエラー
#[test]
fn test_validate_reports_invalid_deployment() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("twinstack.kdl"),
        r#"project "broken"
region "database" {
    name "us-east-2"
}
"#,
    )
    .unwrap();

    twin(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("設定エラー"));
}

/// plan は両リージョンの計画を表示する
#[test]
fn test_plan_lists_both_regions() {
    let dir = initialized_project();
    twin(dir.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("database (us-east-2)"))
        .stdout(predicate::str::contains("app (us-east-1)"))
        .stdout(predicate::str::contains("Delete autoscaling group twinstack-asg"))
        .stdout(predicate::str::contains("twin up --yes"));
}

/// --yes なしの up は計画を表示して終了する（AWSには接続しない）
#[test]
fn test_up_without_yes_only_prints_plan() {
    let dir = initialized_project();
    twin(dir.path())
        .arg("up")
        .assert()
        .success()
        .stdout(predicate::str::contains("database (us-east-2)"))
        .stdout(predicate::str::contains("--yes オプションを指定してください"))
        .stdout(predicate::str::contains("AWSに接続中").not());
    assert!(!dir.path().join(".twinstack/lock.json").exists());
}

/// --only で片方のリージョンだけを計画する
#[test]
fn test_up_only_database() {
    let dir = initialized_project();
    twin(dir.path())
        .args(["up", "--only", "db"])
        .assert()
        .success()
        .stdout(predicate::str::contains("database (us-east-2)"))
        .stdout(predicate::str::contains("app (us-east-1)").not());
}

/// --yes なしの down は計画を表示して終了する
#[test]
fn test_down_without_yes_only_prints_plan() {
    let dir = initialized_project();
    twin(dir.path())
        .arg("down")
        .assert()
        .success()
        .stdout(predicate::str::contains("app (us-east-1)"))
        .stdout(predicate::str::contains("--yes オプションを指定してください"));
}

/// TWINSTACK_CONFIG_PATH で別ディレクトリの定義を使える
#[test]
fn test_config_path_env() {
    let project = initialized_project();
    let elsewhere = tempfile::tempdir().unwrap();

    twin(elsewhere.path())
        .env("TWINSTACK_CONFIG_PATH", project.path().join("twinstack.kdl"))
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("twinstack.kdl"));
}
