//! Orchestrator for a complete migration run
//!
//! Runs the stages in order over the selected repositories:
//! 1. Build the rename table from the whole registry
//! 2. Sync mirrors (when `clone` is enabled)
//! 3. Squash eligible branches
//! 4. Rewrite the anchor repository
//! 5. Publish eligible branches
//!
//! A repository that fails stages 2, 3 or 5 is recorded in the report and
//! dropped from the later stages. A failed anchor rewrite ends the run:
//! nothing is published and the error is kept in [`RunReport::aborted`]
//! next to the failures recorded before it.

use log::info;

use super::{mirror, publish, rewrite, squash, MigrationRun, RunReport, Stage, Toolkit};
use crate::config::Config;
use crate::error::Result;
use crate::registry::Registry;
use crate::rename::RenameTable;
use crate::repository::Repository;

/// Execute a migration run over `repos`.
///
/// `registry` supplies the rename table, so identifiers of repositories
/// outside `repos` are still rewritten in the anchor.
pub fn execute(
    config: &Config,
    registry: &Registry,
    repos: &[Repository],
    run: &MigrationRun,
    toolkit: &Toolkit,
) -> Result<RunReport> {
    let mut report = RunReport::default();
    let git = toolkit.git.as_ref();
    let skip = config.skip_policy();

    // The table is complete before any stage touches a mirror.
    let table = RenameTable::build(registry, config);
    info!("Rename table has {} entries", table.len());
    info!("Active branches: {}", run.branches.join(", "));

    let mut active: Vec<Repository> = repos
        .iter()
        .filter(|repo| {
            let hosted = registry.is_hosted(repo);
            if hosted {
                info!(
                    "{} is already hosted on the destination, not migrating it",
                    repo.source_full_name()
                );
            }
            !hosted
        })
        .cloned()
        .collect();

    // Stage 1: Mirror Sync
    if config.clone {
        let results =
            mirror::sync_all(git, &config.gitdir, &active, run.full_reclone, config.jobs)?;
        let mut failed = Vec::new();
        for (repo, result) in results {
            match result {
                Ok(outcome) => {
                    info!("Mirror of {} ready ({:?})", repo.source_full_name(), outcome);
                    report.synced.push(repo.source_full_name());
                }
                Err(e) => {
                    // Every repository sharing this mirror goes too.
                    failed.push(repo.mirror_path(&config.gitdir));
                    report.fail(&repo, Stage::MirrorSync, e);
                }
            }
        }
        active.retain(|repo| !failed.contains(&repo.mirror_path(&config.gitdir)));
    } else {
        info!("Mirror sync disabled, using mirrors as they are");
    }

    // Stage 2: History Squash
    let mut squashed_ok = Vec::with_capacity(active.len());
    for repo in active {
        match squash::squash_repository(
            git,
            toolkit.squash.as_ref(),
            &skip,
            &config.gitdir,
            &repo,
            &run.branches,
            run.dry_run,
        ) {
            Ok(branches) => {
                report.squashed.extend(
                    branches
                        .into_iter()
                        .map(|branch| (repo.source_full_name(), branch)),
                );
                squashed_ok.push(repo);
            }
            Err(e) => report.fail(&repo, Stage::Squash, e),
        }
    }

    // Stage 3: Reference Rewrite
    match rewrite::rewrite_anchor(
        git,
        toolkit.substituter.as_ref(),
        config,
        &table,
        run.dry_run,
    ) {
        Ok(outcome) => report.rewrite = Some(outcome),
        Err(e) => {
            log::error!("Anchor rewrite failed, nothing will be published: {}", e);
            report.aborted = Some(e);
            return Ok(report);
        }
    }

    // Stage 4: Publish
    for repo in &squashed_ok {
        match publish::publish_repository(git, config, &skip, repo, &run.branches, run.dry_run) {
            Ok(branches) => report.pushed.extend(
                branches
                    .into_iter()
                    .map(|branch| (repo.destination_full_name(), branch)),
            ),
            Err(e) => report.fail(repo, Stage::Publish, e),
        }
    }

    Ok(report)
}
