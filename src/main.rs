//! # repo-migrate CLI
//!
//! This is the binary entry point for the `repo-migrate` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Translating a failed command into an error message and exit code.
//!
//! The migration logic lives in the `repo_migrate` library crate; the binary
//! is a thin wrapper around it.

mod cli;
mod commands;

use clap::Parser;
use std::process::ExitCode;

use repo_migrate::exit_codes;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::for_error(&e))
        }
    }
}
