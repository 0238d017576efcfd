//! # Preview Command Implementation
//!
//! Recreates the destination repositories, empty, in the staging
//! organizations before a rehearsal run. Only runs when the configuration
//! carries an `org_suffix` and every destination organization is one of the
//! configured `preview_orgs`.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use repo_migrate::defaults::DEFAULT_CONFIG_FILE;
use repo_migrate::hosting::GitHubClient;
use repo_migrate::output::{emoji, OutputConfig};
use repo_migrate::preview;

/// Pause between deleting and recreating repositories.
const SETTLE_PAUSE: Duration = Duration::from_secs(3);

/// Reset the preview organizations
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Path to the configuration file.
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "REPO_MIGRATE_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Log every delete and create without calling the hosting API's
    /// mutating endpoints.
    #[arg(long)]
    pub dry_run: bool,

    /// Only delete and recreate this repository, by source short name.
    #[arg(long, value_name = "NAME")]
    pub single_repo: Option<String>,
}

/// Execute the `preview` command.
pub fn execute(args: PreviewArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let (config, registry) = super::load_registry(&args.config)?;
    let repos = super::restrict(registry.all.clone(), args.single_repo.as_deref())?;

    preview::check_preview_scope(&config, &repos)?;
    let client = GitHubClient::from_config(&config)?;
    let report = preview::reset_preview(
        &client,
        &config,
        &repos,
        args.single_repo.is_some(),
        args.dry_run,
        SETTLE_PAUSE,
    )?;

    let tag = if args.dry_run { " (dry run)" } else { "" };
    println!(
        "\n{} Preview reset{}",
        emoji(&out, "📊", "[INFO]"),
        tag
    );
    println!("   Deleted: {}", report.deleted.len());
    println!("   Created: {}", report.created.len());
    if !report.already_present.is_empty() {
        println!("   Already present: {}", report.already_present.join(", "));
    }
    Ok(())
}
