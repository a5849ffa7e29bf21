//! Command helper utilities: default roots, prompts and plan printing

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use console::Style;
use inquire::{Confirm, Text};

use crate::error::Result;
use crate::manifest;
use crate::paths::Environment;
use crate::reconcile::{Action, ReconciliationPlan};

/// Prompts are shown only when asked for and a person is at the keyboard
pub fn is_interactive(yes: bool) -> bool {
    !yes && std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Install root input: explicit path, or the local or global default
pub fn install_path_input(explicit: Option<&str>, local: bool, env: &Environment) -> String {
    match explicit {
        Some(path) => path.to_string(),
        None if local => env.tilde(&env.local_install_root()),
        None => env.tilde(&env.global_install_root()),
    }
}

/// Install path for commands that act on an existing installation.
///
/// Without `--install-path` or `--local`, a lock file in the project-local
/// root wins over the global root.
pub fn existing_install_input(explicit: Option<&str>, local: bool, env: &Environment) -> String {
    let local_root = env.local_install_root();
    if explicit.is_none() && !local && manifest::manifest_path(&local_root).is_file() {
        return env.tilde(&local_root);
    }
    install_path_input(explicit, local, env)
}

/// Claude root input: explicit path, or the local or global default
pub fn claude_path_input(explicit: Option<&str>, local: bool, env: &Environment) -> String {
    match explicit {
        Some(path) => path.to_string(),
        None if local => env.tilde(&env.local_claude_root()),
        None => env.tilde(&env.global_claude_root()),
    }
}

/// Ask for a path, pre-filled with `default`
pub fn prompt_path(message: &str, default: &str, help: &str) -> Result<String> {
    Ok(Text::new(message)
        .with_default(default)
        .with_help_message(help)
        .prompt()?)
}

/// Ask for a final yes/no
pub fn confirm(message: &str) -> Result<bool> {
    Ok(Confirm::new(message)
        .with_default(true)
        .with_help_message("Press Enter to confirm, or 'n' to cancel")
        .prompt()?)
}

/// Print a labelled path, `~/…` where possible
pub fn print_root(label: &str, path: &Path, env: &Environment) {
    println!(
        "  {} {}",
        Style::new().bold().apply_to(format!("{label:<13}")),
        env.tilde(path)
    );
}

/// One line per settings backup taken
pub fn print_backups(backups: &[PathBuf], env: &Environment) {
    for backup in backups {
        println!(
            "  {} {}",
            Style::new().dim().apply_to("Settings backup:"),
            env.tilde(backup)
        );
    }
}

/// Print every entry of a plan, one per line
pub fn print_plan(plan: &ReconciliationPlan, env: &Environment) {
    for op in plan.ops() {
        let style = match op.action() {
            Action::Create => Style::new().green(),
            Action::Overwrite => Style::new().cyan(),
            Action::Remove => Style::new().red(),
            Action::LeaveAsIs => Style::new().dim(),
        };
        println!(
            "  {} {} {}",
            style.apply_to(format!("{:<9}", op.action().to_string())),
            op.logical_path,
            Style::new().dim().apply_to(env.tilde(&op.physical))
        );
    }
}
