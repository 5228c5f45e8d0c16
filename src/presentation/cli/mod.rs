pub mod commands;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::exit;

use crate::presentation::cli::commands::SyncCommand;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

/// sync-repos - Update every source code repository found in a directory tree
#[derive(Parser, Debug)]
#[command(name = "sync-repos")]
#[command(about = "Synchronise source control repositories found in a directory tree")]
#[command(version, long_version = LONG_VERSION)]
pub struct Cli {
    /// Root of the directory tree to update (defaults to the current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Never ask for credentials; skip remotes that would need user interaction
    #[arg(
        short,
        long,
        visible_alias = "do-not-ask",
        env = "SYNC_REPOS_DAEMON"
    )]
    pub daemon: bool,

    /// Do not probe or set up authentication for newly discovered remotes
    #[arg(long)]
    pub no_setup: bool,

    /// Number of repositories updated in parallel (0 = number of CPUs)
    #[arg(short, long, default_value_t = 1, env = "SYNC_REPOS_JOBS")]
    pub jobs: usize,

    /// Kill SCM commands running longer than this many seconds
    #[arg(long, value_name = "SECS", env = "SYNC_REPOS_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
}

impl CliApp {
    pub fn new() -> Self {
        Self { cli: Cli::parse() }
    }

    pub fn from_cli(cli: Cli) -> Self {
        Self { cli }
    }

    pub fn cli(&self) -> &Cli {
        &self.cli
    }

    pub async fn run(self) -> anyhow::Result<()> {
        if self.cli.no_color {
            colored::control::set_override(false);
        }

        let command = SyncCommand::new(
            self.cli.root.clone(),
            self.cli.daemon,
            self.cli.no_setup,
            self.cli.jobs,
            self.cli.timeout,
            self.cli.verbose,
        );

        match command.execute().await {
            Ok(()) => Ok(()),
            Err(e) => {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                exit(1);
            }
        }
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}
