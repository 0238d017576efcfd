//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand: load every input of a
//! migration run and report on it without touching any mirror or remote.
//!
//! ## Checks
//!
//! - **Configuration**: `config.yaml` parses and its values are consistent.
//! - **Repository table**: every row has five valid fields.
//! - **Pipeline definition**: parses, and yields the in-scope branches.
//! - **Rename table**: built from the registry; `--show-renames` prints it in
//!   application order.
//! - **Warnings**: skip policy entries naming unknown repositories, a missing
//!   anchor mirror, an empty branch set.
//!
//! Errors fail the command with the configuration exit code. Warnings are
//! printed and only fail the command with `--strict`.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use repo_migrate::defaults::DEFAULT_CONFIG_FILE;
use repo_migrate::output::{emoji, OutputConfig};
use repo_migrate::rename::RenameTable;

/// Validate the configuration, repository table and pipeline definition
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the configuration file.
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "REPO_MIGRATE_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Print the rename table in the order it is applied.
    #[arg(long)]
    pub show_renames: bool,

    /// Use strict validation (fail on warnings).
    #[arg(long)]
    pub strict: bool,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Validating configuration: {}",
        emoji(&out, "🔍", "[SCAN]"),
        args.config.display()
    );

    let (config, registry) = super::load_registry(&args.config)?;
    println!(
        "{} Configuration and repository table parsed successfully",
        emoji(&out, "✅", "[OK]")
    );
    let branches = super::load_branches(&config)?;
    let table = RenameTable::build(&registry, &config);

    println!("\n{} Migration Summary:", emoji(&out, "📊", "[INFO]"));
    println!("   Repositories: {}", registry.all.len());
    println!("   To migrate: {}", registry.pipeline.len());
    println!("   Already hosted: {}", registry.hosted.len());
    println!("   Active branches: {}", branches.join(", "));
    println!("   Rename entries: {}", table.len());
    println!("   Anchor: {}@{}", config.anchor_repo, config.anchor_branch);

    let mut warnings = Vec::new();
    if branches.is_empty() {
        warnings.push("no branch patterns found for check or gate".to_string());
    }
    for repo in config.skip_branches.keys() {
        if !registry.all.iter().any(|r| &r.source_full_name() == repo) {
            warnings.push(format!("skip_branches names unknown repository '{}'", repo));
        }
    }
    let anchor_mirror = config.anchor_repository()?.mirror_path(&config.gitdir);
    if !anchor_mirror.is_dir() {
        warnings.push(format!(
            "anchor mirror {} does not exist yet",
            anchor_mirror.display()
        ));
    }

    if args.show_renames {
        println!("\n{} Rename table:", emoji(&out, "🔁", "[RENAMES]"));
        for entry in table.entries() {
            println!("   {}", entry);
        }
    }

    println!();
    for warning in &warnings {
        println!("{} {}", emoji(&out, "⚠️", "[WARN]"), warning);
    }
    if warnings.is_empty() {
        println!("{} Validation passed", emoji(&out, "✅", "[OK]"));
    } else if args.strict {
        anyhow::bail!("validation failed with {} warning(s)", warnings.len());
    } else {
        println!(
            "{} Validation passed with {} warning(s)",
            emoji(&out, "✅", "[OK]"),
            warnings.len()
        );
    }
    Ok(())
}
