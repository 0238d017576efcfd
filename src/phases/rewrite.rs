//! Stage 3: Reference Rewrite
//!
//! Runs once per migration, against the anchor repository's mirror, which
//! must have `anchor_branch` checked out:
//!
//! 1. `patch` - apply `<patches_dir>/<name>.patch` if it exists
//! 2. `substitute` - rewrite every old identifier in the tree, longest first
//! 3. `stage` and `commit` - record the result with the configured message
//!
//! "Nothing to commit" is tolerated. Every other failure names the step it
//! happened in and ends the run. A rerun after a failed patch needs the
//! anchor's working tree reset by hand first.

use std::path::{Path, PathBuf};

use log::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::git::{CommitOutcome, GitOperations, MirrorState};
use crate::rename::RenameTable;
use crate::repository::Repository;
use crate::substitute::TreeSubstituter;

/// Result of the anchor rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    Committed,
    /// No entry matched anything in the tree.
    NothingToCommit,
    DryRun,
}

struct Anchor {
    repo: Repository,
    branch: String,
    path: PathBuf,
}

impl Anchor {
    fn context(&self) -> String {
        format!("{}@{}", self.repo.source_full_name(), self.branch)
    }

    fn error(&self, step: &str, message: impl Into<String>) -> Error {
        Error::Rewrite {
            repo: self.context(),
            step: step.to_string(),
            message: message.into(),
        }
    }
}

/// Patches, rewrites and commits the anchor repository.
pub fn rewrite_anchor(
    git: &dyn GitOperations,
    substituter: &dyn TreeSubstituter,
    config: &Config,
    table: &RenameTable,
    dry_run: bool,
) -> Result<RewriteOutcome> {
    let repo = config.anchor_repository()?;
    let anchor = Anchor {
        path: repo.mirror_path(&config.gitdir),
        branch: config.anchor_branch.clone(),
        repo,
    };

    if git.probe(&anchor.path) != MirrorState::Healthy {
        return Err(anchor.error(
            "locate",
            format!("no mirror at {}", anchor.path.display()),
        ));
    }
    let checked_out = git
        .current_branch(&anchor.path)
        .map_err(|e| anchor.error("locate", e.to_string()))?;
    if checked_out != anchor.branch {
        return Err(anchor.error(
            "locate",
            format!(
                "{} has {} checked out, expected {}",
                anchor.path.display(),
                checked_out,
                anchor.branch
            ),
        ));
    }

    let patch = std::path::absolute(config.patch_path(&anchor.repo))
        .map_err(|e| anchor.error("patch", e.to_string()))?;
    apply_patch(git, &anchor, &patch, dry_run)?;

    info!(
        "{}Rewriting {} identifier(s) in {}",
        dry_run_prefix(dry_run),
        table.len(),
        anchor.context()
    );
    if !dry_run {
        substituter
            .substitute_all(&anchor.path, table)
            .map_err(|e| {
                if e.is_config() {
                    e
                } else {
                    anchor.error("substitute", e.to_string())
                }
            })?;
    }

    info!(
        "{}Committing {} with message {:?}",
        dry_run_prefix(dry_run),
        anchor.context(),
        config.commit_message
    );
    if dry_run {
        return Ok(RewriteOutcome::DryRun);
    }
    git.add_all(&anchor.path)
        .map_err(|e| anchor.error("stage", e.to_string()))?;
    match git
        .commit(&anchor.path, &config.commit_message)
        .map_err(|e| anchor.error("commit", e.to_string()))?
    {
        CommitOutcome::Committed => Ok(RewriteOutcome::Committed),
        CommitOutcome::NothingToCommit => {
            info!("Nothing to commit in {}", anchor.context());
            Ok(RewriteOutcome::NothingToCommit)
        }
    }
}

fn apply_patch(
    git: &dyn GitOperations,
    anchor: &Anchor,
    patch: &Path,
    dry_run: bool,
) -> Result<()> {
    if !patch.is_file() {
        info!("No patch for {} at {}", anchor.context(), patch.display());
        return Ok(());
    }
    info!(
        "{}Applying {} to {}",
        dry_run_prefix(dry_run),
        patch.display(),
        anchor.context()
    );
    if dry_run {
        return Ok(());
    }
    git.apply_patch(&anchor.path, patch)
        .map_err(|e| anchor.error("patch", e.to_string()))
}

fn dry_run_prefix(dry_run: bool) -> &'static str {
    if dry_run {
        "DRY RUN: "
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::fakes::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let mut config = config(&temp.path().join("mirrors"));
            config.patches_dir = temp.path().join("patches");
            Self {
                _temp: temp,
                config,
            }
        }

        fn anchor_path(&self) -> PathBuf {
            self.config
                .anchor_repository()
                .unwrap()
                .mirror_path(&self.config.gitdir)
        }

        fn git(&self) -> FakeGit {
            FakeGit::default().with_mirror(self.anchor_path(), &["master"])
        }

        fn write_patch(&self) -> PathBuf {
            fs::create_dir_all(&self.config.patches_dir).unwrap();
            let patch = self.config.patches_dir.join("project-config.patch");
            fs::write(&patch, "--- a/x\n+++ b/x\n").unwrap();
            patch
        }
    }

    #[test]
    fn test_anchor_mirror_lives_under_old_hostname() {
        let fixture = Fixture::new();
        assert!(fixture
            .anchor_path()
            .ends_with("gerrit.example.com/OldOrg/project-config"));
    }

    #[test]
    fn test_patch_substitute_commit_in_order() {
        let fixture = Fixture::new();
        let patch = fixture.write_patch();
        let git = fixture.git();
        let substituter = FakeSubstituter::default();

        let outcome =
            rewrite_anchor(&git, &substituter, &fixture.config, &table(), false).unwrap();

        assert_eq!(outcome, RewriteOutcome::Committed);
        let dir = fixture.anchor_path();
        assert_eq!(
            git.calls(),
            vec![
                format!("apply {} {}", dir.display(), patch.display()),
                format!("add {}", dir.display()),
                format!("commit {} .", dir.display()),
            ]
        );
        // Longest identifier first.
        let substituted = substituter.calls.lock().unwrap().clone();
        assert_eq!(substituted.len(), 2);
        assert!(substituted[0].contains("gerrit.example.com/OldOrg/proj1"));
    }

    #[test]
    fn test_missing_patch_is_not_an_error() {
        let fixture = Fixture::new();
        let git = fixture.git();

        rewrite_anchor(&git, &FakeSubstituter::default(), &fixture.config, &table(), false)
            .unwrap();

        assert!(!git.calls().iter().any(|c| c.starts_with("apply")));
    }

    #[test]
    fn test_patch_conflict_is_rewrite_error_before_substitution() {
        let fixture = Fixture::new();
        fixture.write_patch();
        let git = FakeGit {
            fail_patch: true,
            ..fixture.git()
        };
        let substituter = FakeSubstituter::default();

        let err =
            rewrite_anchor(&git, &substituter, &fixture.config, &table(), false).unwrap_err();

        match err {
            Error::Rewrite { repo, step, .. } => {
                assert_eq!(repo, "OldOrg/project-config@master");
                assert_eq!(step, "patch");
            }
            other => panic!("expected rewrite error, got {:?}", other),
        }
        assert!(substituter.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_nothing_to_commit_is_tolerated() {
        let fixture = Fixture::new();
        let git = FakeGit {
            clean_tree: true,
            ..fixture.git()
        };

        let outcome =
            rewrite_anchor(&git, &FakeSubstituter::default(), &fixture.config, &table(), false)
                .unwrap();

        assert_eq!(outcome, RewriteOutcome::NothingToCommit);
    }

    #[test]
    fn test_dry_run_mutates_nothing() {
        let fixture = Fixture::new();
        fixture.write_patch();
        let git = fixture.git();
        let substituter = FakeSubstituter::default();

        let outcome =
            rewrite_anchor(&git, &substituter, &fixture.config, &table(), true).unwrap();

        assert_eq!(outcome, RewriteOutcome::DryRun);
        assert!(git.calls().is_empty());
        assert!(substituter.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_anchor_mirror_fails_even_in_dry_run() {
        let fixture = Fixture::new();
        let git = FakeGit::default();

        let err = rewrite_anchor(&git, &FakeSubstituter::default(), &fixture.config, &table(), true)
            .unwrap_err();

        assert!(matches!(err, Error::Rewrite { ref step, .. } if step == "locate"));
    }

    #[test]
    fn test_anchor_on_wrong_branch_fails_before_any_change() {
        let fixture = Fixture::new();
        fixture.write_patch();
        let git = FakeGit {
            head: Some("stable/2019".to_string()),
            ..fixture.git()
        };
        let substituter = FakeSubstituter::default();

        let err =
            rewrite_anchor(&git, &substituter, &fixture.config, &table(), false).unwrap_err();

        match err {
            Error::Rewrite { step, message, .. } => {
                assert_eq!(step, "locate");
                assert!(message.contains("stable/2019"));
                assert!(message.contains("expected master"));
            }
            other => panic!("expected rewrite error, got {:?}", other),
        }
        assert!(git.calls().is_empty());
        assert!(substituter.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_native_substitution_rewrites_anchor_tree() {
        let fixture = Fixture::new();
        let dir = fixture.anchor_path();
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("projects.yaml"),
            "clone gerrit.example.com/OldOrg/proj1 now\n- OldOrg/proj1\n",
        )
        .unwrap();
        let git = fixture.git();

        rewrite_anchor(
            &git,
            &crate::substitute::NativeSubstituter,
            &fixture.config,
            &table(),
            false,
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(dir.join("projects.yaml")).unwrap(),
            "clone github.com/NewOrg/proj1-new now\n- NewOrg/proj1-new\n"
        );
    }
}
