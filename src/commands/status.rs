//! Status command: report drift between the lock file and the disk

use console::Style;

use crate::cli::StatusArgs;
use crate::commands::helpers;
use crate::error::Result;
use crate::operations::{self, FileStatus};
use crate::paths::{self, Environment};

/// Run status command
pub fn run(args: StatusArgs) -> Result<()> {
    let env = Environment::from_process()?;
    let install_input = helpers::existing_install_input(args.install_path.as_deref(), args.local, &env);
    let install_root = paths::resolve_install_root(&install_input, &env)?;

    let report = operations::status(&install_root)?;
    let lock = &report.manifest;

    println!("{}", Style::new().bold().apply_to("the-startup"));
    helpers::print_root("Install root:", &lock.install_root, &env);
    helpers::print_root("Claude root:", &lock.claude_root, &env);
    println!("  {:<13} {}", Style::new().bold().apply_to("Installed:"), lock.install_date);
    let components: Vec<String> = lock.components.iter().map(ToString::to_string).collect();
    println!(
        "  {:<13} {}",
        Style::new().bold().apply_to("Components:"),
        components.join(", ")
    );
    println!();

    for entry in &report.entries {
        let style = match entry.status {
            FileStatus::Ok => Style::new().green(),
            FileStatus::Modified => Style::new().yellow(),
            FileStatus::Missing => Style::new().red(),
        };
        let label = style.apply_to(format!("{:<9}", entry.status.to_string()));
        if entry.status == FileStatus::Ok {
            println!("  {label} {}", entry.logical_path);
        } else {
            println!(
                "  {label} {} {}",
                entry.logical_path,
                Style::new().dim().apply_to(env.tilde(&entry.physical))
            );
        }
    }

    match report.hooks_registered {
        Some(true) => println!("\n  Hooks registered in settings.json"),
        Some(false) => println!(
            "\n  {} hooks are not registered in settings.json",
            Style::new().yellow().apply_to("warning:")
        ),
        None => {}
    }

    println!();
    println!(
        "{} ok, {} modified, {} missing",
        report.count(FileStatus::Ok),
        report.count(FileStatus::Modified),
        report.count(FileStatus::Missing)
    );
    if !report.is_clean() {
        println!("Run `the-startup install` to restore the installed files.");
    }

    Ok(())
}
