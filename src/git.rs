//! # Git Operations
//!
//! Every git interaction of a migration run goes through the
//! [`GitOperations`] trait. The pipeline never models git's object graph; it
//! only asks git to do things and inspects the outcome.
//!
//! [`DefaultGitOperations`] shells out to the system `git` binary, which
//! picks up SSH keys, credential helpers and `~/.gitconfig` the same way an
//! interactive user would. Tests substitute recording fakes.
//!
//! Outcomes that the pipeline must tolerate ("remote already exists",
//! "nothing to commit") are reported as values rather than errors so callers
//! cannot mistake them for failures.

use crate::error::{Error, Result};
use log::debug;
use std::collections::BTreeSet;
use std::path::Path;
use std::process::{Command, Output};

/// Remote the mirror was cloned from.
pub const ORIGIN: &str = "origin";

/// State of a local mirror directory before syncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    /// Nothing at the mirror path.
    Missing,
    /// Something is there but it is not a checkout: a file, or a directory
    /// without `.git`.
    Invalid,
    Healthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    NothingToCommit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Added,
    AlreadyExists,
}

/// Remote-tracking refs of a mirror, e.g. `refs/remotes/origin/master`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRefs {
    refs: BTreeSet<String>,
}

impl RemoteRefs {
    pub fn new<I, S>(refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            refs: refs.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `refs/remotes/origin/<branch>` exists.
    pub fn has_origin_branch(&self, branch: &str) -> bool {
        self.refs
            .contains(&format!("refs/remotes/{}/{}", ORIGIN, branch))
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Classifies whatever is at `dir` without running git.
    fn probe(&self, dir: &Path) -> MirrorState;

    /// Clones `url` into `target_dir`. The parent directory must exist.
    fn clone_repo(&self, url: &str, target_dir: &Path) -> Result<()>;

    fn fetch_all(&self, dir: &Path) -> Result<()>;

    fn pull(&self, dir: &Path) -> Result<()>;

    /// Lists every remote-tracking ref of the repository at `dir`.
    fn remote_refs(&self, dir: &Path) -> Result<RemoteRefs>;

    /// Applies `patch` to the working tree, failing on any conflict.
    fn apply_patch(&self, dir: &Path, patch: &Path) -> Result<()>;

    /// Stages every change, including deletions.
    fn add_all(&self, dir: &Path) -> Result<()>;

    fn commit(&self, dir: &Path, message: &str) -> Result<CommitOutcome>;

    /// Name of the branch checked out at `dir`.
    fn current_branch(&self, dir: &Path) -> Result<String>;

    fn remote_add(&self, dir: &Path, name: &str, url: &str) -> Result<RemoteOutcome>;

    /// URL configured for remote `name`.
    fn remote_url(&self, dir: &Path, name: &str) -> Result<String>;

    fn set_remote_url(&self, dir: &Path, name: &str, url: &str) -> Result<()>;

    fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<()>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command.
#[derive(Debug, Clone, Default)]
pub struct DefaultGitOperations {
    env: Vec<(String, String)>,
}

impl DefaultGitOperations {
    /// Runs git with `env` added to the inherited environment.
    pub fn new(env: Vec<(String, String)>) -> Self {
        Self { env }
    }

    fn command(&self, dir: &Path, args: &[&str]) -> Command {
        debug!("executing: git {} in: {}", args.join(" "), dir.display());
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(dir);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }

    fn output(&self, dir: &Path, args: &[&str]) -> Result<Output> {
        self.command(dir, args)
            .output()
            .map_err(|e| git_error(dir, args, e.to_string()))
    }

    /// Runs git and fails on a non-zero exit.
    fn run(&self, dir: &Path, args: &[&str]) -> Result<Output> {
        let output = self.output(dir, args)?;
        if !output.status.success() {
            return Err(git_error(dir, args, combined_output(&output)));
        }
        Ok(output)
    }
}

impl GitOperations for DefaultGitOperations {
    fn probe(&self, dir: &Path) -> MirrorState {
        if !dir.exists() {
            return MirrorState::Missing;
        }
        // Structural only: a mirror git cannot be run against is reported by
        // the fetch that follows, not mistaken for a broken directory.
        if dir.is_dir() && dir.join(".git").exists() {
            MirrorState::Healthy
        } else {
            MirrorState::Invalid
        }
    }

    fn clone_repo(&self, url: &str, target_dir: &Path) -> Result<()> {
        let parent = match target_dir.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        // git runs inside `parent`, so only the last component names the target.
        let name = target_dir.file_name().ok_or_else(|| {
            let message = format!("{} does not name a directory", target_dir.display());
            git_error(parent, &["clone", url], message)
        })?;
        let name = name.to_string_lossy();
        self.run(parent, &["clone", url, name.as_ref()])?;
        Ok(())
    }

    fn fetch_all(&self, dir: &Path) -> Result<()> {
        self.run(dir, &["fetch", "--all"])?;
        Ok(())
    }

    fn pull(&self, dir: &Path) -> Result<()> {
        self.run(dir, &["pull"])?;
        Ok(())
    }

    fn remote_refs(&self, dir: &Path) -> Result<RemoteRefs> {
        let output = self.run(dir, &["for-each-ref", "--format=%(refname)", "refs/remotes"])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(RemoteRefs::new(
            stdout.lines().map(str::trim).filter(|line| !line.is_empty()),
        ))
    }

    fn apply_patch(&self, dir: &Path, patch: &Path) -> Result<()> {
        let patch = patch.to_string_lossy();
        self.run(dir, &["apply", patch.as_ref()])?;
        Ok(())
    }

    fn add_all(&self, dir: &Path) -> Result<()> {
        self.run(dir, &["add", "-A"])?;
        Ok(())
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<CommitOutcome> {
        let args = ["commit", "-m", message];
        let output = self.output(dir, &args)?;
        if output.status.success() {
            return Ok(CommitOutcome::Committed);
        }
        let text = combined_output(&output);
        if is_nothing_to_commit(&text) {
            return Ok(CommitOutcome::NothingToCommit);
        }
        Err(git_error(dir, &args, text))
    }

    fn current_branch(&self, dir: &Path) -> Result<String> {
        let output = self.run(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn remote_add(&self, dir: &Path, name: &str, url: &str) -> Result<RemoteOutcome> {
        let args = ["remote", "add", name, url];
        let output = self.output(dir, &args)?;
        if output.status.success() {
            return Ok(RemoteOutcome::Added);
        }
        let text = combined_output(&output);
        if text.contains("already exists") {
            return Ok(RemoteOutcome::AlreadyExists);
        }
        Err(git_error(dir, &args, text))
    }

    fn remote_url(&self, dir: &Path, name: &str) -> Result<String> {
        let output = self.run(dir, &["remote", "get-url", name])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn set_remote_url(&self, dir: &Path, name: &str, url: &str) -> Result<()> {
        self.run(dir, &["remote", "set-url", name, url])?;
        Ok(())
    }

    fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<()> {
        self.run(dir, &["push", remote, branch])?;
        Ok(())
    }
}

fn git_error(dir: &Path, args: &[&str], stderr: String) -> Error {
    Error::GitCommand {
        command: format!("git {}", args.join(" ")),
        dir: dir.display().to_string(),
        stderr,
    }
}

fn combined_output(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut text = stderr.trim().to_string();
    if !stdout.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stdout.trim());
    }
    if text.is_empty() {
        text = format!("exit status {}", output.status);
    }
    text
}

fn is_nothing_to_commit(text: &str) -> bool {
    text.contains("nothing to commit") || text.contains("nothing added to commit")
}

/// Whether a git failure means the directory is not a usable repository.
pub fn is_not_a_repository(error: &Error) -> bool {
    match error {
        Error::GitCommand { stderr, .. } => stderr.contains("not a git repository"),
        _ => false,
    }
}
