//! the-startup - agent assets for Claude Code
//!
//! Installs a bundle of agents, commands, hooks, rules, output styles and
//! templates, records every placed file in a lock file, and reconciles the
//! disk against that lock file on every later install or uninstall.

use clap::Parser;
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

mod apply;
mod assets;
mod cli;
mod commands;
mod common;
mod error;
mod hash;
mod manifest;
mod operations;
mod paths;
mod progress;
mod reconcile;
mod routing;
mod settings;

#[cfg(test)]
mod test_fixtures;

use cli::{Cli, Commands};

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Install(args) => commands::install::run(args, cli.verbose),
        Commands::Uninstall(args) => commands::uninstall::run(args, cli.verbose),
        Commands::Status(args) => commands::status::run(args),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if let Some(help) = e.help() {
            eprintln!("  help: {help}");
        }
        std::process::exit(e.exit_code());
    }
}
