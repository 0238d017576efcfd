//! # External Tools
//!
//! Some steps of a migration are delegated to site-specific executables that
//! the pipeline treats as black boxes: the history squash script and,
//! optionally, a tree substitution script. Both are reached through
//! [`ExternalTool`], a single "run against this directory with these
//! arguments" capability, so the pipeline logic can be exercised with fakes.

use crate::error::{Error, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A black-box executable run inside a directory.
pub trait ExternalTool: Send + Sync {
    /// Runs the tool in `dir`. A non-zero exit is an error.
    fn run(&self, dir: &Path, args: &[&str]) -> Result<()>;

    /// Human-readable command line, used in logs and dry-run output.
    fn describe(&self, args: &[&str]) -> String;
}

/// An executable on disk, run as a subprocess.
#[derive(Debug, Clone)]
pub struct ScriptTool {
    program: PathBuf,
    env: Vec<(String, String)>,
}

impl ScriptTool {
    /// `program` is made absolute against the current directory so it keeps
    /// working once the tool runs inside a mirror.
    pub fn new(program: &Path, env: Vec<(String, String)>) -> Result<Self> {
        let program = if program.is_absolute() {
            program.to_path_buf()
        } else {
            std::env::current_dir()?.join(program)
        };
        Ok(Self { program, env })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl ExternalTool for ScriptTool {
    fn run(&self, dir: &Path, args: &[&str]) -> Result<()> {
        debug!("executing: {} in: {}", self.describe(args), dir.display());
        let mut cmd = Command::new(&self.program);
        cmd.args(args).current_dir(dir);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let output = cmd.output().map_err(|e| Error::Tool {
            program: self.program.display().to_string(),
            dir: dir.display().to_string(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Tool {
                program: self.program.display().to_string(),
                dir: dir.display().to_string(),
                message: format!("{}: {}", output.status, stderr.trim()),
            });
        }
        Ok(())
    }

    fn describe(&self, args: &[&str]) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(args.iter().map(|arg| arg.to_string()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
