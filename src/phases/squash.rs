//! Stage 2: History Squash
//!
//! Runs the external squash script once per eligible branch, inside the
//! repository's mirror. Ineligible branches are logged and skipped. The first
//! script failure stops the remaining branches of that repository.

use std::path::Path;

use log::info;

use crate::config::SkipPolicy;
use crate::error::{Error, Result};
use crate::git::GitOperations;
use crate::phases::{branch_eligibility, Eligibility};
use crate::repository::Repository;
use crate::tools::ExternalTool;

/// Squashes every eligible branch of `repo`. Returns the branches squashed
/// (or, in dry-run, the branches that would be).
pub fn squash_repository(
    git: &dyn GitOperations,
    tool: &dyn ExternalTool,
    skip: &SkipPolicy,
    mirror_root: &Path,
    repo: &Repository,
    branches: &[String],
    dry_run: bool,
) -> Result<Vec<String>> {
    let path = repo.mirror_path(mirror_root);
    let refs = git.remote_refs(&path)?;
    let mut squashed = Vec::new();

    for branch in branches {
        match branch_eligibility(&refs, skip, repo, branch) {
            Eligibility::Eligible => {
                info!("Squashing {} branch {}", repo.source_full_name(), branch);
                if dry_run {
                    info!(
                        "DRY RUN: would run {} in {}",
                        tool.describe(&[branch.as_str()]),
                        path.display()
                    );
                } else {
                    tool.run(&path, &[branch.as_str()]).map_err(|e| Error::Squash {
                        repo: repo.source_full_name(),
                        branch: branch.clone(),
                        message: e.to_string(),
                    })?;
                }
                squashed.push(branch.clone());
            }
            reason => {
                info!(
                    "Skipping branch {} of {}: {}",
                    branch,
                    repo.source_full_name(),
                    reason
                );
            }
        }
    }

    Ok(squashed)
}
