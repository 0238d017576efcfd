//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::commands;

/// repo-migrate - Move a fleet of repositories to new organizations
#[derive(Parser, Debug)]
#[command(name = "repo-migrate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync, squash, rewrite and publish the repositories in the registry
    Migrate(commands::migrate::MigrateArgs),

    /// Recreate the destination repositories in the preview organizations
    Preview(commands::preview::PreviewArgs),

    /// Check the configuration, repository table and pipeline definition
    Validate(commands::validate::ValidateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::from_env(Env::default().default_filter_or(&self.log_level))
            .format_timestamp(None)
            .init();

        match self.command {
            Commands::Migrate(args) => commands::migrate::execute(args, &self.color),
            Commands::Preview(args) => commands::preview::execute(args, &self.color),
            Commands::Validate(args) => commands::validate::execute(args, &self.color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
