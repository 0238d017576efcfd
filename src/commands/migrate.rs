//! # Migrate Command Implementation
//!
//! This module implements the `migrate` subcommand, which runs the full
//! migration pipeline over the repository table.
//!
//! ## Process
//!
//! 1. **Load**: Read `config.yaml`, the repository table and the pipeline
//!    definition. Any problem here is a configuration error and nothing is
//!    touched.
//! 2. **Select**: Keep the repositories routed through the pipeline,
//!    optionally only the one named by `--single-repo`.
//! 3. **Run**: Sync, squash, rewrite the anchor and publish.
//! 4. **Report**: Print a summary. Any failed repository, or an aborted
//!    anchor rewrite, makes the command fail after the summary is printed.

use anyhow::Result;
use clap::Args;
use log::info;
use std::path::PathBuf;

use repo_migrate::defaults::DEFAULT_CONFIG_FILE;
use repo_migrate::error::Error;
use repo_migrate::output::{format_run_report, OutputConfig};
use repo_migrate::phases::{orchestrator, MigrationRun, Toolkit};

/// Run the migration pipeline
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Path to the configuration file.
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "REPO_MIGRATE_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Decide and log every action without squashing, committing, adding
    /// remotes or pushing. Mirrors are still synced.
    #[arg(long)]
    pub dry_run: bool,

    /// Delete every mirror and clone it again.
    #[arg(long)]
    pub full_reclone: bool,

    /// Restrict the run to one repository, by source short name.
    #[arg(long, value_name = "NAME")]
    pub single_repo: Option<String>,

    /// Number of parallel mirror syncs. Overrides `jobs` in the configuration.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}

/// Execute the `migrate` command.
pub fn execute(args: MigrateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let (mut config, registry) = super::load_registry(&args.config)?;
    let branches = super::load_branches(&config)?;

    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            return Err(Error::config("--jobs must be at least 1").into());
        }
        config.jobs = Some(jobs);
    }

    let repos = super::restrict(registry.select(None), args.single_repo.as_deref())?;
    let toolkit = Toolkit::from_config(&config)?;
    let run = MigrationRun {
        dry_run: args.dry_run,
        full_reclone: args.full_reclone,
        branches,
    };

    if run.dry_run {
        info!("DRY RUN: no squash, commit, remote or push will be performed");
    }
    let mut report = orchestrator::execute(&config, &registry, &repos, &run, &toolkit)?;
    print!("{}", format_run_report(&out, &report, run.dry_run));

    if let Some(fatal) = report.aborted.take() {
        return Err(fatal.into());
    }
    if !report.is_success() {
        anyhow::bail!("{} repository stage(s) failed", report.failures.len());
    }
    Ok(())
}
