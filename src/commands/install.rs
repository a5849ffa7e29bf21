//! Install command CLI wrapper
//!
//! Resolves the two roots (prompting when interactive), picks the asset
//! source and delegates everything else to `operations::install`.

use chrono::Utc;
use console::Style;

use crate::assets::{AssetSource, DirAssets, EmbeddedAssets};
use crate::cli::InstallArgs;
use crate::commands::helpers;
use crate::error::Result;
use crate::manifest;
use crate::operations::{self, InstallConfig, InstallReport};
use crate::paths::{self, Environment};
use crate::progress::ProgressDisplay;
use crate::reconcile::PlanSummary;
use crate::settings::PatchOutcome;

/// Run install command
pub fn run(args: InstallArgs, verbose: bool) -> Result<()> {
    let env = Environment::from_process()?;
    let interactive = helpers::is_interactive(args.yes);

    let mut install_input =
        helpers::install_path_input(args.install_path.as_deref(), args.local, &env);
    if interactive && args.install_path.is_none() {
        install_input = helpers::prompt_path(
            "Install directory",
            &install_input,
            "Templates and the lock file are stored here",
        )?;
    }
    let install_root = paths::resolve_install_root(&install_input, &env)?;

    let mut claude_input =
        helpers::claude_path_input(args.claude_path.as_deref(), args.local, &env);
    if interactive && args.claude_path.is_none() {
        let suggested = paths::propose_local_claude_root(&install_root)
            .map_or(claude_input, |proposal| env.tilde(&proposal));
        claude_input = helpers::prompt_path(
            "Claude directory",
            &suggested,
            "Agents, commands, hooks, rules and output styles are installed here",
        )?;
    }
    let resolved = paths::resolve(&install_input, &claude_input, &env)?;
    if let Some(proposal) = resolved
        .local_claude_proposal
        .as_ref()
        .filter(|proposal| **proposal != resolved.claude_root && !interactive)
    {
        println!(
            "{} a project-local install usually pairs with {} (see --claude-path)",
            Style::new().dim().apply_to("note:"),
            env.tilde(proposal)
        );
    }

    let source: Box<dyn AssetSource> = match &args.assets {
        Some(dir) => Box::new(DirAssets::open(dir)?),
        None => Box::new(EmbeddedAssets::new()),
    };

    let config = InstallConfig {
        install_root: resolved.install_root,
        claude_root: resolved.claude_root,
        components: args.components,
        skip_unchanged: args.skip_unchanged,
        dry_run: args.dry_run,
        now: Utc::now(),
    };

    println!(
        "{}",
        Style::new().bold().apply_to("Installing the-startup")
    );
    helpers::print_root("Install root:", &config.install_root, &env);
    helpers::print_root("Claude root:", &config.claude_root, &env);
    println!();

    if interactive && !args.dry_run && !helpers::confirm("Proceed with installation?")? {
        println!("Installation cancelled. No changes were made.");
        return Ok(());
    }

    let mut progress = ProgressDisplay::new(!args.dry_run && !verbose);
    let result = operations::install(source.as_ref(), &config, &env, |op, step| {
        progress.update(op, step);
    });
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
        print_dry_run(&report, &config, &env);
        return Ok(());
    }

    print_report(&report, &config, &env);

    match report.remove_error() {
        Some(err) => {
            for failure in &report.remove_failures {
                eprintln!(
                    "{} could not remove {} ({}): {}",
                    Style::new().yellow().apply_to("warning:"),
                    failure.logical_path,
                    env.tilde(&failure.path),
                    failure.reason
                );
            }
            Err(err)
        }
        None => Ok(()),
    }
}

fn print_dry_run(report: &InstallReport, config: &InstallConfig, env: &Environment) {
    println!("[DRY RUN] Would apply:");
    helpers::print_plan(&report.plan, env);
    println!();
    println!("[DRY RUN] {}", summary_line(&report.summary));
    if config.hooks_selected() {
        println!("[DRY RUN] Would register hooks in settings.json");
    } else {
        println!("[DRY RUN] Would remove hooks from settings.json");
    }
}

fn print_report(report: &InstallReport, config: &InstallConfig, env: &Environment) {
    println!(
        "{} {}",
        Style::new().green().bold().apply_to("✓"),
        summary_line(&report.summary)
    );

    match (report.settings, config.hooks_selected()) {
        (Some(PatchOutcome::Created), _) => println!("  Created settings.json with agent hooks"),
        (Some(PatchOutcome::Updated), true) => println!("  Registered agent hooks in settings.json"),
        (Some(PatchOutcome::Updated), false) => println!("  Removed agent hooks from settings.json"),
        _ => {}
    }
    helpers::print_backups(&report.settings_backup, env);

    if let Some(lock) = &report.manifest {
        println!(
            "  {} {} ({} files)",
            Style::new().dim().apply_to("Lock file:"),
            env.tilde(&manifest::manifest_path(&config.install_root)),
            lock.files.len()
        );
    }
}

fn summary_line(summary: &PlanSummary) -> String {
    format!(
        "{} created, {} updated, {} removed, {} unchanged",
        summary.create, summary.overwrite, summary.remove, summary.leave
    )
}
