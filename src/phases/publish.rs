//! Stage 4: Publish
//!
//! Points a destination remote at the new location of each repository and
//! pushes every eligible branch to it.
//!
//! Planning and execution are split so that a dry run goes through exactly
//! the same decisions as a live run: [`plan_push`] reads the mirror and
//! decides, [`execute_push`] either runs or logs the resulting commands.

use std::path::PathBuf;

use log::{info, warn};

use crate::config::{Config, SkipPolicy};
use crate::error::{Error, Result};
use crate::git::{GitOperations, RemoteOutcome};
use crate::phases::{branch_eligibility, Eligibility};
use crate::repository::Repository;

/// Everything decided about publishing one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPlan {
    pub repo: Repository,
    pub mirror: PathBuf,
    pub remote_name: String,
    pub remote_url: String,
    /// Every in-scope branch with its eligibility, in branch order.
    pub decisions: Vec<(String, Eligibility)>,
}

impl PushPlan {
    pub fn branches_to_push(&self) -> impl Iterator<Item = &str> {
        self.decisions
            .iter()
            .filter(|(_, eligibility)| eligibility.is_eligible())
            .map(|(branch, _)| branch.as_str())
    }
}

/// Decides which branches of `repo` are pushed and where.
pub fn plan_push(
    git: &dyn GitOperations,
    config: &Config,
    skip: &SkipPolicy,
    repo: &Repository,
    branches: &[String],
) -> Result<PushPlan> {
    let mirror = repo.mirror_path(&config.gitdir);
    let refs = git.remote_refs(&mirror).map_err(|e| Error::Publish {
        repo: repo.destination_full_name(),
        branch: None,
        message: e.to_string(),
    })?;
    let decisions = branches
        .iter()
        .map(|branch| {
            (
                branch.clone(),
                branch_eligibility(&refs, skip, repo, branch),
            )
        })
        .collect();

    Ok(PushPlan {
        repo: repo.clone(),
        mirror,
        remote_name: config.new_remote_name.clone(),
        remote_url: config.push_url(repo),
        decisions,
    })
}

/// Adds the remote and pushes the plan's eligible branches, stopping at the
/// first failed push. In dry-run only the commands are logged.
///
/// Returns the branches pushed (or that would be).
pub fn execute_push(
    git: &dyn GitOperations,
    plan: &PushPlan,
    dry_run: bool,
) -> Result<Vec<String>> {
    let prefix = if dry_run { "DRY RUN: " } else { "" };
    let destination = plan.repo.destination_full_name();

    info!(
        "{}git remote add {} {} in {}",
        prefix,
        plan.remote_name,
        plan.remote_url,
        plan.mirror.display()
    );
    if !dry_run {
        ensure_remote(git, plan).map_err(|e| Error::Publish {
            repo: destination.clone(),
            branch: None,
            message: e.to_string(),
        })?;
    }

    let mut pushed = Vec::new();
    for (branch, eligibility) in &plan.decisions {
        if !eligibility.is_eligible() {
            info!("Not pushing {} of {}: {}", branch, destination, eligibility);
            continue;
        }
        info!("{}git push {} {} for {}", prefix, plan.remote_name, branch, destination);
        if !dry_run {
            git.push(&plan.mirror, &plan.remote_name, branch)
                .map_err(|e| Error::Publish {
                    repo: destination.clone(),
                    branch: Some(branch.clone()),
                    message: e.to_string(),
                })?;
        }
        pushed.push(branch.clone());
    }
    Ok(pushed)
}

/// Adds the destination remote, or repoints an existing one whose URL no
/// longer matches the plan.
fn ensure_remote(git: &dyn GitOperations, plan: &PushPlan) -> Result<()> {
    let outcome = git.remote_add(&plan.mirror, &plan.remote_name, &plan.remote_url)?;
    if outcome == RemoteOutcome::Added {
        return Ok(());
    }
    let current = git.remote_url(&plan.mirror, &plan.remote_name)?;
    if current == plan.remote_url {
        info!(
            "Remote {} already exists in {}, reusing it",
            plan.remote_name,
            plan.mirror.display()
        );
        return Ok(());
    }
    warn!(
        "Remote {} in {} points at {}, changing it to {}",
        plan.remote_name,
        plan.mirror.display(),
        current,
        plan.remote_url
    );
    git.set_remote_url(&plan.mirror, &plan.remote_name, &plan.remote_url)
}

/// Plans and executes the publication of one repository.
pub fn publish_repository(
    git: &dyn GitOperations,
    config: &Config,
    skip: &SkipPolicy,
    repo: &Repository,
    branches: &[String],
    dry_run: bool,
) -> Result<Vec<String>> {
    let plan = plan_push(git, config, skip, repo, branches)?;
    execute_push(git, &plan, dry_run)
}
