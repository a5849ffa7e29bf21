//! Common test utilities for the-startup integration tests

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Isolated home, project, bundle and the two install roots
#[allow(dead_code)]
pub struct TestEnv {
    /// Temporary directory
    pub temp: TempDir,
    pub home: PathBuf,
    pub project: PathBuf,
    /// Directory passed to `--assets`
    pub bundle: PathBuf,
    pub install_root: PathBuf,
    pub claude_root: PathBuf,
}

#[allow(dead_code)]
impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let base = dunce::canonicalize(temp.path()).expect("Failed to canonicalize temp dir");
        let home = base.join("home");
        let project = home.join("project");
        let bundle = base.join("bundle");
        std::fs::create_dir_all(&project).expect("Failed to create project directory");
        std::fs::create_dir_all(&bundle).expect("Failed to create bundle directory");

        Self {
            install_root: home.join(".config/the-startup"),
            claude_root: home.join(".claude"),
            temp,
            home,
            project,
            bundle,
        }
    }

    /// Environment with the default fixture bundle in place
    pub fn with_bundle() -> Self {
        let env = Self::new();
        env.write_bundle_file("agents/the-analyst.md", "# Analyst\n");
        env.write_bundle_file("agents/the-architect.md", "# Architect\n");
        env.write_bundle_file(
            "commands/specify.md",
            "Templates live in {{STARTUP_PATH}}/templates\n",
        );
        env.write_bundle_file("hooks/log_agent_start.py", "#!/usr/bin/env python3\n");
        env.write_bundle_file("hooks/log_agent_complete.py", "#!/usr/bin/env python3\n");
        env.write_bundle_file("rules/agent-delegation.md", "# Delegation\n");
        env.write_bundle_file("output-styles/the-startup.md", "# Style\n");
        env.write_bundle_file("templates/PRD.md", "# PRD\n");
        env
    }

    /// Command with HOME and the working directory pointed into the sandbox
    pub fn cmd(&self) -> Command {
        let mut cmd = startup_cmd();
        cmd.current_dir(&self.project)
            .env("HOME", &self.home)
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("THE_STARTUP_INSTALL_PATH")
            .env_remove("THE_STARTUP_CLAUDE_PATH")
            .env_remove("RUST_LOG");
        cmd
    }

    /// `install` against both roots with the fixture bundle, no prompts
    pub fn install_cmd(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.arg("install")
            .arg("--install-path")
            .arg(&self.install_root)
            .arg("--claude-path")
            .arg(&self.claude_root)
            .arg("--assets")
            .arg(&self.bundle)
            .arg("--yes");
        cmd
    }

    pub fn uninstall_cmd(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.arg("uninstall")
            .arg("--install-path")
            .arg(&self.install_root)
            .arg("--yes");
        cmd
    }

    pub fn status_cmd(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.arg("status").arg("--install-path").arg(&self.install_root);
        cmd
    }

    pub fn write_bundle_file(&self, path: &str, content: &str) {
        write_file(&self.bundle.join(path), content);
    }

    pub fn remove_bundle_file(&self, path: &str) {
        std::fs::remove_file(self.bundle.join(path)).expect("Failed to remove bundle file");
    }

    pub fn lock_path(&self) -> PathBuf {
        self.install_root.join("the-startup.lock")
    }

    /// Parsed lock file
    pub fn lock(&self) -> serde_json::Value {
        let text = std::fs::read_to_string(self.lock_path()).expect("Failed to read lock file");
        serde_json::from_str(&text).expect("Lock file is not JSON")
    }

    /// Logical paths recorded in the lock file
    pub fn locked_files(&self) -> Vec<String> {
        self.lock()["files"]
            .as_object()
            .expect("files is not an object")
            .keys()
            .cloned()
            .collect()
    }

    pub fn settings_path(&self) -> PathBuf {
        self.claude_root.join("settings.json")
    }

    pub fn settings(&self) -> serde_json::Value {
        let text =
            std::fs::read_to_string(self.settings_path()).expect("Failed to read settings.json");
        serde_json::from_str(&text).expect("settings.json is not JSON")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

// Temporary fix for deprecated cargo_bin - will be updated when build-dir issues are resolved
#[allow(deprecated)]
pub fn startup_cmd() -> Command {
    Command::cargo_bin("the-startup").expect("the-startup binary not built")
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(path, content).expect("Failed to write file");
}

/// Number of entries tagged with our marker across both hook events
#[allow(dead_code)]
pub fn marked_hooks(settings: &serde_json::Value) -> usize {
    ["PreToolUse", "PostToolUse"]
        .iter()
        .filter_map(|event| settings["hooks"][event].as_array())
        .flatten()
        .filter_map(|group| group["hooks"].as_array())
        .flatten()
        .filter(|hook| hook["_source"] == "the-startup")
        .count()
}
