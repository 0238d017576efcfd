//! Implementation of the stages of a migration run.
//!
//! ## Overview
//!
//! A run applies four stages, each safe to re-run:
//! 1. Mirror Sync - Clone or update the local mirror of every repository
//! 2. History Squash - Collapse the history of every eligible branch
//! 3. Reference Rewrite - Rewrite old identifiers in the anchor repository
//! 4. Publish - Push every eligible branch to the destination remote
//!
//! The rename table is computed from the whole registry before stage 3 and
//! never changes afterwards.
//!
//! Failures in stages 1, 2 and 4 are isolated to the repository they happen
//! in: the repository is dropped from the remaining stages and the run goes
//! on. A failure in stage 3 ends the run, since the anchor rewrite happens
//! exactly once.

use std::fmt;
use std::path::Path;

use crate::config::{Config, SkipPolicy};
use crate::error::{Error, Result};
use crate::git::{DefaultGitOperations, GitOperations, RemoteRefs};
use crate::repository::Repository;
use crate::substitute::{NativeSubstituter, ScriptSubstituter, TreeSubstituter};
use crate::tools::{ExternalTool, ScriptTool};

pub mod mirror;
pub mod orchestrator;
pub mod publish;
pub mod rewrite;
pub mod squash;

/// Process-wide settings of one invocation.
#[derive(Debug, Clone, Default)]
pub struct MigrationRun {
    /// Decide and log everything, mutate nothing beyond the local mirrors.
    pub dry_run: bool,
    /// Delete every mirror before syncing it.
    pub full_reclone: bool,
    /// In-scope branches, deduplicated.
    pub branches: Vec<String>,
}

/// The collaborators a run talks to.
pub struct Toolkit {
    pub git: Box<dyn GitOperations>,
    pub squash: Box<dyn ExternalTool>,
    pub substituter: Box<dyn TreeSubstituter>,
}

impl Toolkit {
    /// System git, the configured squash script, and either the configured
    /// substitution script or the built-in substitution.
    pub fn from_config(config: &Config) -> Result<Self> {
        let env = config.subprocess_env();
        let substituter: Box<dyn TreeSubstituter> = match &config.substitute_script {
            Some(script) => Box::new(ScriptSubstituter::new(Box::new(ScriptTool::new(
                script,
                env.clone(),
            )?))),
            None => Box::new(NativeSubstituter),
        };
        Ok(Self {
            git: Box::new(DefaultGitOperations::new(env.clone())),
            squash: Box::new(ScriptTool::new(&config.squash_script, env)?),
            substituter,
        })
    }

    /// Assembles a toolkit from arbitrary implementations.
    pub fn with_operations(
        git: Box<dyn GitOperations>,
        squash: Box<dyn ExternalTool>,
        substituter: Box<dyn TreeSubstituter>,
    ) -> Self {
        Self {
            git,
            squash,
            substituter,
        }
    }
}

/// Why a branch is or is not migrated for a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// No `refs/remotes/origin/<branch>` in the mirror.
    Absent,
    /// Excluded by the skip policy.
    Skipped,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        self == Eligibility::Eligible
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eligibility::Eligible => write!(f, "eligible"),
            Eligibility::Absent => write!(f, "not present in mirror"),
            Eligibility::Skipped => write!(f, "skipped by policy"),
        }
    }
}

/// Shared by the squash and publish stages so both make the same decision.
pub fn branch_eligibility(
    refs: &RemoteRefs,
    skip: &SkipPolicy,
    repo: &Repository,
    branch: &str,
) -> Eligibility {
    if skip.is_skipped(repo, branch) {
        Eligibility::Skipped
    } else if !refs.has_origin_branch(branch) {
        Eligibility::Absent
    } else {
        Eligibility::Eligible
    }
}

/// Queries the mirror and reports whether `branch` of `repo` is migrated.
pub fn is_branch_migrated(
    git: &dyn GitOperations,
    skip: &SkipPolicy,
    mirror_root: &Path,
    repo: &Repository,
    branch: &str,
) -> Result<bool> {
    let refs = git.remote_refs(&repo.mirror_path(mirror_root))?;
    Ok(branch_eligibility(&refs, skip, repo, branch).is_eligible())
}

/// Stage of a run, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MirrorSync,
    Squash,
    Rewrite,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::MirrorSync => "mirror-sync",
            Stage::Squash => "squash",
            Stage::Rewrite => "rewrite",
            Stage::Publish => "publish",
        };
        write!(f, "{}", name)
    }
}

/// A repository dropped from the run.
#[derive(Debug)]
pub struct StageFailure {
    /// Source full name.
    pub repo: String,
    pub stage: Stage,
    pub error: Error,
}

/// What a run did. In dry-run, `squashed` and `pushed` list what would have
/// been done.
#[derive(Debug, Default)]
pub struct RunReport {
    pub synced: Vec<String>,
    /// (source full name, branch)
    pub squashed: Vec<(String, String)>,
    pub rewrite: Option<rewrite::RewriteOutcome>,
    /// (destination full name, branch)
    pub pushed: Vec<(String, String)>,
    pub failures: Vec<StageFailure>,
    /// The error that ended the run early, after `failures` were recorded.
    pub aborted: Option<Error>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.aborted.is_none()
    }

    pub(crate) fn fail(&mut self, repo: &Repository, stage: Stage, error: Error) {
        log::error!("{} failed for {}: {}", stage, repo.source_full_name(), error);
        self.failures.push(StageFailure {
            repo: repo.source_full_name(),
            stage,
            error,
        });
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use std::collections::BTreeMap;

    fn skip() -> SkipPolicy {
        let mut map = BTreeMap::new();
        map.insert("OldOrg/proj1".to_string(), vec!["stable/2018".to_string()]);
        SkipPolicy::new(map)
    }

    #[test]
    fn test_present_and_not_skipped_is_eligible() {
        let refs = RemoteRefs::new(["refs/remotes/origin/master"]);
        assert_eq!(
            branch_eligibility(&refs, &skip(), &proj1(), "master"),
            Eligibility::Eligible
        );
    }

    #[test]
    fn test_present_but_skipped_is_not_eligible() {
        let refs = RemoteRefs::new(["refs/remotes/origin/stable/2018"]);
        assert_eq!(
            branch_eligibility(&refs, &skip(), &proj1(), "stable/2018"),
            Eligibility::Skipped
        );
    }

    #[test]
    fn test_absent_and_not_skipped_is_not_eligible() {
        let refs = RemoteRefs::new(["refs/remotes/origin/master"]);
        assert_eq!(
            branch_eligibility(&refs, &skip(), &proj1(), "stable/2019"),
            Eligibility::Absent
        );
    }

    #[test]
    fn test_local_branch_does_not_count() {
        let refs = RemoteRefs::new(["refs/heads/stable/2019"]);
        assert!(!branch_eligibility(&refs, &skip(), &proj1(), "stable/2019").is_eligible());
    }

    #[test]
    fn test_is_branch_migrated_queries_mirror() {
        let root = Path::new("/mirrors");
        let git = FakeGit::default().with_mirror(proj1().mirror_path(root), &["master", "stable/2018"]);

        assert!(is_branch_migrated(&git, &skip(), root, &proj1(), "master").unwrap());
        assert!(!is_branch_migrated(&git, &skip(), root, &proj1(), "stable/2018").unwrap());
        assert!(!is_branch_migrated(&git, &skip(), root, &proj1(), "stable/2019").unwrap());
    }

    #[test]
    fn test_toolkit_from_config_uses_native_substitution_by_default() {
        let config = config(Path::new("/mirrors"));
        assert!(Toolkit::from_config(&config).is_ok());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::MirrorSync.to_string(), "mirror-sync");
        assert_eq!(Stage::Publish.to_string(), "publish");
    }
}
