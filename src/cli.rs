//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::routing::Component;

/// the-startup - agent assets for Claude Code
///
/// Installs agents, commands, hooks, rules, output styles and templates, and
/// keeps them in sync with the bundle shipped in this binary.
#[derive(Parser, Debug)]
#[command(
    name = "the-startup",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Install agents, commands, hooks and templates for Claude Code",
    long_about = "the-startup installs a bundle of agents, commands, hooks, rules, output styles \
                  and templates into an install directory and a Claude directory, records \
                  every file it places in a lock file, and uses that lock file to update or \
                  remove exactly those files later.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  the-startup install\n    \
                  the-startup install --local --yes\n    \
                  the-startup status\n    \
                  the-startup uninstall --yes"
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install or update the bundle
    Install(InstallArgs),

    /// Remove every file recorded in the lock file
    Uninstall(UninstallArgs),

    /// Compare the lock file with the files on disk
    Status(StatusArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the install command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                   Interactive install:\n    the-startup install\n\n\
                   Global install with defaults:\n    the-startup install --yes\n\n\
                   Install into the current project:\n    the-startup install --local --yes\n\n\
                   Install only agents and commands:\n    the-startup install -y -c agents -c commands\n\n\
                   Preview without writing anything:\n    the-startup install --dry-run")]
pub struct InstallArgs {
    /// Install directory (default: ~/.config/the-startup, or ./.the-startup with --local)
    #[arg(long, value_name = "PATH", env = "THE_STARTUP_INSTALL_PATH")]
    pub install_path: Option<String>,

    /// Claude directory (default: ~/.claude, or ./.claude with --local)
    #[arg(long, value_name = "PATH", env = "THE_STARTUP_CLAUDE_PATH")]
    pub claude_path: Option<String>,

    /// Use directories in the current project instead of global ones
    #[arg(long, short = 'l')]
    pub local: bool,

    /// Accept defaults and skip all prompts
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Install only these components (repeatable; default: all)
    #[arg(long = "component", short = 'c', value_name = "COMPONENT", value_enum)]
    pub components: Vec<Component>,

    /// Leave files whose content has not changed
    #[arg(long)]
    pub skip_unchanged: bool,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Install from a bundle directory instead of the built-in bundle
    #[arg(long, value_name = "DIR")]
    pub assets: Option<PathBuf>,
}

/// Arguments for the uninstall command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Uninstall the installation found from here (project first, then global):\n    the-startup uninstall\n\n\
                  Uninstall from the current project without confirmation:\n    the-startup uninstall --local -y\n\n\
                  Keep the hook entries in settings.json:\n    the-startup uninstall --keep-settings")]
pub struct UninstallArgs {
    /// Install directory holding the lock file (default: ./.the-startup if it has one, else ~/.config/the-startup)
    #[arg(long, value_name = "PATH", env = "THE_STARTUP_INSTALL_PATH")]
    pub install_path: Option<String>,

    /// Use the installation in the current project
    #[arg(long, short = 'l')]
    pub local: bool,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Do not remove hook entries from settings.json
    #[arg(long)]
    pub keep_settings: bool,

    /// Show what would be removed without removing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Install directory holding the lock file (default: ./.the-startup if it has one, else ~/.config/the-startup)
    #[arg(long, value_name = "PATH", env = "THE_STARTUP_INSTALL_PATH")]
    pub install_path: Option<String>,

    /// Use the installation in the current project
    #[arg(long, short = 'l')]
    pub local: bool,
}

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    the-startup completions --shell bash > ~/.bash_completion.d/the-startup\n\n\
                  Generate zsh completions:\n    the-startup completions --shell zsh > ~/.zfunc/_the-startup\n\n\
                  Generate fish completions:\n    the-startup completions --shell fish > ~/.config/fish/completions/the-startup.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    #[arg(long)]
    pub shell: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        // SAFETY: tests touching the environment are serialized
        unsafe {
            std::env::remove_var("THE_STARTUP_INSTALL_PATH");
            std::env::remove_var("THE_STARTUP_CLAUDE_PATH");
        }
    }

    #[test]
    #[serial]
    fn test_cli_parsing_install_defaults() {
        clear_env();
        let cli = Cli::try_parse_from(["the-startup", "install"]).unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.install_path, None);
                assert_eq!(args.claude_path, None);
                assert!(args.components.is_empty());
                assert!(!args.yes);
                assert!(!args.local);
                assert!(!args.dry_run);
            }
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    #[serial]
    fn test_cli_parsing_install_components() {
        clear_env();
        let cli = Cli::try_parse_from([
            "the-startup",
            "install",
            "-y",
            "-c",
            "agents",
            "--component",
            "output-styles",
            "--install-path",
            "~/tools",
        ])
        .unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert!(args.yes);
                assert_eq!(
                    args.components,
                    vec![Component::Agents, Component::OutputStyles]
                );
                assert_eq!(args.install_path.as_deref(), Some("~/tools"));
            }
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_component() {
        let result = Cli::try_parse_from(["the-startup", "install", "-c", "skills"]);
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_cli_install_path_from_env() {
        clear_env();
        // SAFETY: serialized with the other environment tests
        unsafe {
            std::env::set_var("THE_STARTUP_INSTALL_PATH", "/opt/the-startup");
        }
        let cli = Cli::try_parse_from(["the-startup", "uninstall"]).unwrap();
        clear_env();
        match cli.command {
            Commands::Uninstall(args) => {
                assert_eq!(args.install_path.as_deref(), Some("/opt/the-startup"));
            }
            _ => panic!("Expected Uninstall command"),
        }
    }

    #[test]
    #[serial]
    fn test_cli_parsing_uninstall_flags() {
        clear_env();
        let cli = Cli::try_parse_from([
            "the-startup",
            "uninstall",
            "--local",
            "--keep-settings",
            "--dry-run",
            "-y",
        ])
        .unwrap();
        match cli.command {
            Commands::Uninstall(args) => {
                assert!(args.local);
                assert!(args.keep_settings);
                assert!(args.dry_run);
                assert!(args.yes);
            }
            _ => panic!("Expected Uninstall command"),
        }
    }

    #[test]
    fn test_cli_verbose_is_global() {
        let cli = Cli::try_parse_from(["the-startup", "status", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_cli_parsing_completions() {
        let cli = Cli::try_parse_from(["the-startup", "completions", "--shell", "zsh"]).unwrap();
        match cli.command {
            Commands::Completions(args) => assert_eq!(args.shell, "zsh"),
            _ => panic!("Expected Completions command"),
        }
    }
}
