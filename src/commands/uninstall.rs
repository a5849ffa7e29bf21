//! Uninstall command CLI wrapper
//!
//! This module provides the CLI interface for uninstall operations,
//! delegating all business logic to operations/uninstall.rs.

use chrono::Utc;
use console::Style;

use crate::cli::UninstallArgs;
use crate::commands::helpers;
use crate::error::Result;
use crate::operations::uninstall::require_manifest;
use crate::operations::{self, UninstallConfig};
use crate::paths::{self, Environment};
use crate::progress::ProgressDisplay;
use crate::settings::PatchOutcome;

/// Run uninstall command
pub fn run(args: UninstallArgs, verbose: bool) -> Result<()> {
    let env = Environment::from_process()?;
    let interactive = helpers::is_interactive(args.yes);

    let install_input = helpers::existing_install_input(args.install_path.as_deref(), args.local, &env);
    let install_root = paths::resolve_install_root(&install_input, &env)?;

    let config = UninstallConfig {
        install_root,
        keep_settings: args.keep_settings,
        dry_run: args.dry_run,
        now: Utc::now(),
    };

    if interactive && !args.dry_run {
        let lock = require_manifest(&config.install_root)?;
        println!("\nThe following installation will be removed:");
        helpers::print_root("Install root:", &lock.install_root, &env);
        helpers::print_root("Claude root:", &lock.claude_root, &env);
        println!("  {} file(s) recorded in the lock file", lock.files.len());
        println!();

        if !helpers::confirm("Proceed with uninstall?")? {
            println!("Uninstall cancelled. No changes were made.");
            return Ok(());
        }
    }

    let mut progress = ProgressDisplay::new(!args.dry_run && !verbose);
    let result = operations::uninstall(&config, |op, step| progress.update(op, step));
    let report = match result {
        Ok(report) => {
            progress.finish();
            report
        }
        Err(e) => {
            progress.abandon();
            return Err(e);
        }
    };

    if config.dry_run {
        println!("[DRY RUN] Would remove:");
        helpers::print_plan(&report.plan, &env);
        if !config.keep_settings {
            println!("[DRY RUN] Would remove hooks from settings.json");
        }
        return Ok(());
    }

    if let Some(err) = report.remove_error() {
        for failure in &report.remove_failures {
            eprintln!(
                "{} could not remove {} ({}): {}",
                Style::new().yellow().apply_to("warning:"),
                failure.logical_path,
                env.tilde(&failure.path),
                failure.reason
            );
        }
        return Err(err);
    }

    println!(
        "{} Removed {} file(s) installed into {}",
        Style::new().green().bold().apply_to("✓"),
        report.summary.remove,
        env.tilde(&report.manifest.claude_root)
    );
    if report.settings == Some(PatchOutcome::Updated) {
        println!("  Removed agent hooks from settings.json");
    }
    helpers::print_backups(&report.settings_backup, &env);
    if report.install_root_removed {
        println!("  Removed {}", env.tilde(&config.install_root));
    }

    Ok(())
}
