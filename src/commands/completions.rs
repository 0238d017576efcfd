//! # Completions Command Implementation
//!
//! Prints a `clap_complete` script for one shell. The script completes the
//! `migrate`, `preview` and `validate` subcommands and their flags
//! (`--config`, `--dry-run`, `--single-repo`, ...), so an operator preparing a
//! run can tab through them.
//!
//! ```bash
//! repo-migrate completions bash > ~/.local/share/bash-completion/completions/repo-migrate
//! repo-migrate completions zsh --output ~/.zfunc/_repo-migrate
//! ```

use anyhow::{Context, Result};
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the script for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Execute the `completions` command.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };
    generate(args.shell, &mut cmd, name, &mut sink);
    sink.flush()?;
    Ok(())
}
