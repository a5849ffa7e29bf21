//! Uninstall command tests

mod common;

use std::fs;

use predicates::prelude::*;

#[test]
fn test_uninstall_removes_everything_recorded() {
    let env = common::TestEnv::with_bundle();
    env.install_cmd().assert().success();

    env.uninstall_cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));

    assert!(!env.lock_path().exists());
    assert!(!env.claude_root.join("agents/the-analyst.md").exists());
    assert!(!env.claude_root.join("hooks/log_agent_start.py").exists());
    assert!(!env.install_root.join("templates/PRD.md").exists());
    assert!(!env.install_root.exists());
}

#[test]
fn test_uninstall_restores_user_settings() {
    let env = common::TestEnv::with_bundle();
    let original = "{\n  \"theme\": \"dark\"\n}\n";
    common::write_file(&env.settings_path(), original);

    env.install_cmd().assert().success();
    assert_eq!(common::marked_hooks(&env.settings()), 2);

    env.uninstall_cmd().assert().success();

    assert_eq!(fs::read_to_string(env.settings_path()).unwrap(), original);
}

#[test]
fn test_uninstall_keep_settings() {
    let env = common::TestEnv::with_bundle();
    env.install_cmd().assert().success();

    env.uninstall_cmd().arg("--keep-settings").assert().success();

    assert!(!env.lock_path().exists());
    assert_eq!(common::marked_hooks(&env.settings()), 2);
}

#[test]
fn test_uninstall_without_lock_file() {
    let env = common::TestEnv::new();
    env.uninstall_cmd()
        .assert()
        .code(9)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_uninstall_dry_run_keeps_files() {
    let env = common::TestEnv::with_bundle();
    env.install_cmd().assert().success();

    env.uninstall_cmd()
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN]"))
        .stdout(predicate::str::contains("agents/the-analyst.md"));

    assert!(env.lock_path().is_file());
    assert!(env.claude_root.join("agents/the-analyst.md").is_file());
}

#[test]
fn test_uninstall_tolerates_already_deleted_files() {
    let env = common::TestEnv::with_bundle();
    env.install_cmd().assert().success();
    fs::remove_file(env.claude_root.join("agents/the-analyst.md")).unwrap();

    env.uninstall_cmd().assert().success();

    assert!(!env.lock_path().exists());
}

#[test]
fn test_uninstall_corrupt_settings_leaves_install_intact() {
    let env = common::TestEnv::with_bundle();
    env.install_cmd().assert().success();
    fs::write(env.settings_path(), "[1, 2").unwrap();

    env.uninstall_cmd().assert().code(6);

    assert!(env.lock_path().is_file());
    assert!(env.claude_root.join("agents/the-analyst.md").is_file());
}

#[test]
fn test_uninstall_leaves_user_files() {
    let env = common::TestEnv::with_bundle();
    env.install_cmd().assert().success();
    let user_file = env.install_root.join("notes.md");
    common::write_file(&user_file, "keep me");

    env.uninstall_cmd().assert().success();

    assert_eq!(fs::read_to_string(&user_file).unwrap(), "keep me");
    assert!(!env.lock_path().exists());
}

#[test]
fn test_uninstall_prefers_project_local_install() {
    let env = common::TestEnv::with_bundle();
    env.install_cmd().assert().success();
    env.cmd()
        .args(["install", "--local", "--yes", "--assets"])
        .arg(&env.bundle)
        .assert()
        .success();

    env.cmd().args(["uninstall", "--yes"]).assert().success();

    assert!(!env.project.join(".the-startup/the-startup.lock").exists());
    assert!(!env.project.join(".claude/agents/the-analyst.md").exists());
    assert!(env.lock_path().is_file());
    assert!(env.claude_root.join("agents/the-analyst.md").is_file());
}

#[test]
fn test_uninstall_falls_back_to_global_install() {
    let env = common::TestEnv::with_bundle();
    env.install_cmd().assert().success();

    env.cmd().args(["uninstall", "--yes"]).assert().success();

    assert!(!env.lock_path().exists());
    assert!(!env.claude_root.join("agents/the-analyst.md").exists());
}

#[test]
fn test_uninstall_backs_up_settings() {
    let env = common::TestEnv::with_bundle();
    common::write_file(&env.settings_path(), "{\n  \"theme\": \"dark\"\n}\n");
    env.install_cmd().assert().success();
    let installed = fs::read_to_string(env.settings_path()).unwrap();

    env.uninstall_cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Settings backup:"));

    let backups: Vec<String> = fs::read_dir(env.claude_root.join("backups"))
        .unwrap()
        .map(|e| fs::read_to_string(e.unwrap().path()).unwrap())
        .collect();
    assert!(backups.contains(&installed));
}
