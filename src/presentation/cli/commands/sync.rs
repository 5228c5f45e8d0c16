use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use crate::application::services::ConsolePrompter;
use crate::application::use_cases::sync_repositories::{
    SyncReport, SyncRepositoriesConfig, SyncRepositoriesUseCase,
};
use crate::common::error::SyncError;
use crate::infrastructure::keyring::SecretStorage;
use crate::infrastructure::process::{CommandRunner, TokioCommandRunner};
use crate::infrastructure::scm::ScmFactory;

/// Handler for a synchronisation run
pub struct SyncCommand {
    pub root: Option<PathBuf>,
    pub daemon: bool,
    pub no_setup: bool,
    pub jobs: usize,
    pub timeout: Option<u64>,
    pub verbose: bool,
}

impl SyncCommand {
    pub fn new(
        root: Option<PathBuf>,
        daemon: bool,
        no_setup: bool,
        jobs: usize,
        timeout: Option<u64>,
        verbose: bool,
    ) -> Self {
        Self {
            root,
            daemon,
            no_setup,
            jobs,
            timeout,
            verbose,
        }
    }

    /// Run configuration, checked before the secure store is touched.
    pub fn config(&self) -> Result<SyncRepositoriesConfig> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Cannot determine the current directory")?,
        };

        let config = SyncRepositoriesConfig::new(root)
            .with_daemon(self.daemon)
            .with_no_setup(self.no_setup)
            .with_parallel_jobs(self.jobs)
            .with_timeout_seconds(self.timeout)
            .with_verbose(self.verbose);
        config.validate().map_err(SyncError::from)?;
        Ok(config)
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.config()?;

        // The store must be usable before anything is probed.
        let storage = SecretStorage::open_default()?;
        tracing::debug!("Using secure store '{}'", storage.backend_name());

        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::with_timeout(
            self.timeout.map(Duration::from_secs),
        ));
        let scms = ScmFactory::create_all(runner);

        let mut use_case =
            SyncRepositoriesUseCase::new(config, storage, scms, Box::new(ConsolePrompter::new()));
        let report = use_case.execute().await?;

        self.print_summary(&report);
        Ok(())
    }

    fn print_summary(&self, report: &SyncReport) {
        if report.total_count() == 0 {
            println!("{} No remotes to update.", "::".blue().bold());
            return;
        }

        println!(
            "{} Synchronization completed: {} updated, {} failed, {} skipped",
            "✓".green().bold(),
            report.updated.len(),
            report.failed.len(),
            report.skipped.len()
        );

        if self.verbose {
            for target in &report.updated {
                println!("  updated  {}", target);
            }
            for (target, reason) in &report.skipped {
                println!("  skipped  {} ({})", target, reason);
            }
        }

        if !report.failed.is_empty() {
            eprintln!("{} Some updates failed:", "⚠".yellow().bold());
            for (target, error) in &report.failed {
                eprintln!("  {}: {}", target, error.red());
            }
        }
    }
}
