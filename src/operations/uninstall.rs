//! Uninstall operation
//!
//! Reverses an install using nothing but its lock file: files the lock file
//! does not record are never touched, and the claude root itself is never
//! removed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::apply::{self, RemoveFailure, Step};
use crate::common::fs::remove_dir_if_empty;
use crate::error::{Result, StartupError};
use crate::manifest::{self, Manifest};
use crate::reconcile::{self, PlanSummary, PlannedOp, ReconciliationPlan};
use crate::settings::{self, PatchOutcome};

/// Options for an uninstall run
#[derive(Debug, Clone)]
pub struct UninstallConfig {
    pub install_root: PathBuf,
    /// Leave the hook entries in the host settings alone
    pub keep_settings: bool,
    pub dry_run: bool,
    /// Clock value used to name settings backups
    pub now: DateTime<Utc>,
}

/// What an uninstall run did (or, for a dry run, would do)
#[derive(Debug, Clone)]
pub struct UninstallReport {
    pub manifest: Manifest,
    pub plan: ReconciliationPlan,
    pub summary: PlanSummary,
    pub settings: Option<PatchOutcome>,
    /// Copies of the settings files taken before they were changed
    pub settings_backup: Vec<PathBuf>,
    pub install_root_removed: bool,
    pub remove_failures: Vec<RemoveFailure>,
}

impl UninstallReport {
    /// Aggregated error for removes that failed, if any
    pub fn remove_error(&self) -> Option<StartupError> {
        apply::remove_error(&self.remove_failures)
    }
}

/// Load the lock file for `install_root`, failing when there is none
pub fn require_manifest(install_root: &Path) -> Result<Manifest> {
    manifest::load(install_root)?.ok_or_else(|| StartupError::NoManifest {
        path: manifest::manifest_path(install_root).display().to_string(),
    })
}

/// Run the uninstall pipeline
pub fn uninstall<F>(config: &UninstallConfig, on_op: F) -> Result<UninstallReport>
where
    F: FnMut(&PlannedOp, Step),
{
    let lock = require_manifest(&config.install_root)?;
    let plan = reconcile::uninstall_plan(&lock);
    let summary = plan.summary();
    info!(
        install_root = %config.install_root.display(),
        remove = summary.remove,
        "uninstall"
    );

    if config.dry_run {
        return Ok(UninstallReport {
            manifest: lock,
            plan,
            summary,
            settings: None,
            settings_backup: Vec::new(),
            install_root_removed: false,
            remove_failures: Vec::new(),
        });
    }

    let settings_file = settings::settings_path(&lock.claude_root);
    let mut settings_backup = Vec::new();
    if !config.keep_settings && settings::validate(&settings_file, None)? {
        settings_backup = settings::backup_settings(&lock.claude_root, config.now)?;
    }

    let outcome = apply::apply(&plan, on_op)?;

    let settings = if config.keep_settings {
        None
    } else {
        Some(settings::remove_hooks(&settings_file)?)
    };

    if !outcome.remove_failures.is_empty() {
        // Still on disk, still ours: keep them recorded for the next attempt
        warn!(
            failures = outcome.remove_failures.len(),
            "some files could not be removed; keeping lock file"
        );
        let mut remaining = lock.clone();
        remaining.files = outcome.records;
        manifest::write(&config.install_root, &remaining)?;

        return Ok(UninstallReport {
            manifest: lock,
            plan,
            summary,
            settings,
            settings_backup,
            install_root_removed: false,
            remove_failures: outcome.remove_failures,
        });
    }

    manifest::delete(&config.install_root)?;
    let install_root_removed = remove_dir_if_empty(&config.install_root);
    info!(install_root_removed, "uninstall complete");

    Ok(UninstallReport {
        manifest: lock,
        plan,
        summary,
        settings,
        settings_backup,
        install_root_removed,
        remove_failures: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::install::{InstallConfig, install};
    use crate::routing::LogicalPath;
    use crate::test_fixtures::{MemoryAssets, TestRoots};
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use std::fs;

    fn installed(roots: &TestRoots) {
        let assets = MemoryAssets::new(&[
            ("agents/a.md", b"a"),
            ("commands/c.md", b"c"),
            ("hooks/log_agent_start.py", b"#!/usr/bin/env python3\n"),
            ("hooks/log_agent_complete.py", b"#!/usr/bin/env python3\n"),
            ("templates/PRD.md", b"prd"),
        ]);
        let config = InstallConfig {
            install_root: roots.install_root.clone(),
            claude_root: roots.claude_root.clone(),
            components: Vec::new(),
            skip_unchanged: false,
            dry_run: false,
            now: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        };
        install(&assets, &config, &roots.env, |_, _| {}).unwrap();
    }

    fn config(roots: &TestRoots) -> UninstallConfig {
        UninstallConfig {
            install_root: roots.install_root.clone(),
            keep_settings: false,
            dry_run: false,
            now: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_uninstall_reverses_install() {
        let roots = TestRoots::new();
        fs::create_dir_all(&roots.claude_root).unwrap();
        fs::write(
            roots.claude_root.join("settings.json"),
            "{\"model\": \"opus\", \"permissions\": {\"allow\": [\"Bash\"]}}",
        )
        .unwrap();
        installed(&roots);

        let report = uninstall(&config(&roots), |_, _| {}).unwrap();

        assert_eq!(report.summary.remove, 5);
        assert_eq!(report.settings, Some(PatchOutcome::Updated));
        assert!(report.install_root_removed);
        assert!(!roots.install_root.exists());
        assert!(roots.claude_root.is_dir());
        assert!(!roots.claude_root.join("agents").exists());
        assert!(!roots.claude_root.join("hooks").exists());

        let settings: Value = serde_json::from_str(
            &fs::read_to_string(roots.claude_root.join("settings.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(
            settings,
            serde_json::json!({"model": "opus", "permissions": {"allow": ["Bash"]}})
        );
    }

    #[test]
    fn test_settings_are_backed_up_before_hooks_are_stripped() {
        let roots = TestRoots::new();
        installed(&roots);
        let before = fs::read(roots.claude_root.join("settings.json")).unwrap();

        let report = uninstall(&config(&roots), |_, _| {}).unwrap();

        assert_eq!(
            report.settings_backup,
            vec![roots.claude_root.join("backups/settings.json.backup.20260302_093000")]
        );
        assert_eq!(fs::read(&report.settings_backup[0]).unwrap(), before);
    }

    #[test]
    fn test_uninstall_spares_unrecorded_files() {
        let roots = TestRoots::new();
        installed(&roots);
        let user_agent = roots.claude_root.join("agents/user.md");
        fs::write(&user_agent, "mine").unwrap();
        let user_template = roots.install_root.join("templates/mine.md");
        fs::write(&user_template, "mine").unwrap();

        let report = uninstall(&config(&roots), |_, _| {}).unwrap();

        assert!(user_agent.is_file());
        assert!(user_template.is_file());
        assert!(!report.install_root_removed);
        assert!(!manifest::manifest_path(&roots.install_root).exists());
    }

    #[test]
    fn test_uninstall_without_lock_file() {
        let roots = TestRoots::new();
        let result = uninstall(&config(&roots), |_, _| {});
        assert!(matches!(result, Err(StartupError::NoManifest { .. })));
    }

    #[test]
    fn test_keep_settings_leaves_hooks() {
        let roots = TestRoots::new();
        installed(&roots);
        let before = fs::read(roots.claude_root.join("settings.json")).unwrap();

        let mut keep = config(&roots);
        keep.keep_settings = true;
        let report = uninstall(&keep, |_, _| {}).unwrap();

        assert_eq!(report.settings, None);
        assert_eq!(fs::read(roots.claude_root.join("settings.json")).unwrap(), before);
        assert!(report.settings_backup.is_empty());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let roots = TestRoots::new();
        installed(&roots);

        let mut dry = config(&roots);
        dry.dry_run = true;
        let report = uninstall(&dry, |_, _| {}).unwrap();

        assert_eq!(report.summary.remove, 5);
        assert!(roots.claude_root.join("agents/a.md").is_file());
        assert!(manifest::manifest_path(&roots.install_root).is_file());
    }

    #[test]
    fn test_remove_failures_keep_lock_file() {
        let roots = TestRoots::new();
        installed(&roots);
        // Replace an installed file with a non-empty directory
        let blocked = roots.claude_root.join("commands/c.md");
        fs::remove_file(&blocked).unwrap();
        fs::create_dir_all(blocked.join("inner")).unwrap();

        let report = uninstall(&config(&roots), |_, _| {}).unwrap();
        assert!(matches!(
            report.remove_error(),
            Some(StartupError::RemoveIo { count: 1, .. })
        ));

        let remaining = manifest::load(&roots.install_root).unwrap().unwrap();
        assert_eq!(
            remaining.files.keys().collect::<Vec<_>>(),
            vec![&LogicalPath::new("commands/c.md").unwrap()]
        );
        assert!(!roots.claude_root.join("agents/a.md").exists());
    }
}
