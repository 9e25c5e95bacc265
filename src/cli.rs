//! Command-line surface: global flags and the `install`, `check`, `list`
//! and `version` subcommands.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::orchestrator::FailurePolicy;

/// Top-level CLI entry point for the workstation provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "workstation",
    about = "Idempotent workstation provisioning engine",
    version
)]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Flags accepted by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Cap the total run duration, in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Task manifest to use instead of the builtin one (default: $WORKSTATION_MANIFEST)
    #[arg(long, value_name = "PATH", global = true)]
    pub manifest: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install every missing tool
    Install(InstallOpts),
    /// Report which tools are present without installing anything
    Check(CheckOpts),
    /// List the tasks in the manifest
    List,
    /// Print version information
    Version,
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InstallOpts {
    /// What to do when a task fails
    #[arg(long, value_enum, default_value_t = FailurePolicy::FailFast)]
    pub policy: FailurePolicy,

    /// Skip specific tasks
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Run only specific tasks
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Write a JSON run report to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Options for the `check` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CheckOpts {
    /// Skip specific tasks
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Check only specific tasks
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_install_defaults_to_fail_fast() {
        let cli = Cli::parse_from(["workstation", "install"]);
        assert!(
            matches!(&cli.command, Command::Install(opts) if opts.policy == FailurePolicy::FailFast)
        );
    }

    #[test]
    fn parse_install_continue_on_error() {
        let cli = Cli::parse_from(["workstation", "install", "--policy", "continue-on-error"]);
        assert!(matches!(
            &cli.command,
            Command::Install(opts) if opts.policy == FailurePolicy::ContinueOnError
        ));
    }

    #[test]
    fn parse_install_rejects_unknown_policy() {
        let result = Cli::try_parse_from(["workstation", "install", "--policy", "yolo"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_install_dry_run() {
        let cli = Cli::parse_from(["workstation", "--dry-run", "install"]);
        assert!(cli.global.dry_run);
    }

    #[test]
    fn parse_install_dry_run_short() {
        let cli = Cli::parse_from(["workstation", "-d", "install"]);
        assert!(cli.global.dry_run);
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["workstation", "install", "--timeout", "600", "-v"]);
        assert_eq!(cli.global.timeout, Some(600));
        assert!(cli.verbose);
    }

    #[test]
    fn parse_install_skip_tasks() {
        let cli = Cli::parse_from(["workstation", "install", "--skip", "Neovim,Fish"]);
        assert!(
            matches!(&cli.command, Command::Install(_)),
            "Expected Install command"
        );
        if let Command::Install(opts) = cli.command {
            assert_eq!(opts.skip, vec!["Neovim", "Fish"]);
        }
    }

    #[test]
    fn parse_install_only_and_report() {
        let cli = Cli::parse_from([
            "workstation",
            "install",
            "--only",
            "Node.js",
            "--report",
            "/tmp/run.json",
        ]);
        if let Command::Install(opts) = cli.command {
            assert_eq!(opts.only, vec!["Node.js"]);
            assert_eq!(opts.report, Some(PathBuf::from("/tmp/run.json")));
        } else {
            panic!("expected install");
        }
    }

    #[test]
    fn parse_manifest_path() {
        let cli = Cli::parse_from(["workstation", "--manifest", "/etc/tasks.toml", "list"]);
        assert_eq!(cli.global.manifest, Some(PathBuf::from("/etc/tasks.toml")));
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn parse_check() {
        let cli = Cli::parse_from(["workstation", "check", "--only", "Fish"]);
        assert!(matches!(&cli.command, Command::Check(opts) if opts.only == vec!["Fish"]));
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["workstation", "version"]);
        assert!(matches!(cli.command, Command::Version));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::parse_from(["workstation", "-v", "install"]);
        assert!(cli.verbose);
    }
}
