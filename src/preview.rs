//! # Preview Namespace Housekeeping
//!
//! Before a rehearsal run against a staging namespace (destination
//! organizations carrying `org_suffix`), the destination repositories are
//! recreated empty: existing repositories are deleted, then every selected
//! destination repository is created.
//!
//! Deletion is scoped to the selected repositories when the run is
//! restricted to a subset; otherwise every repository in the configured
//! preview organizations is removed. Both steps honour dry-run.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hosting::HostingProvider;
use crate::repository::Repository;
use log::info;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// What a preview reset did (or would do, in dry-run).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewReport {
    pub deleted: Vec<String>,
    pub created: Vec<String>,
    pub already_present: Vec<String>,
}

/// Checks that a preview reset cannot touch anything but staging namespaces.
pub fn check_preview_scope(config: &Config, repos: &[Repository]) -> Result<()> {
    if config.org_suffix.is_empty() {
        return Err(Error::Config {
            message: "refusing to reset repositories without an org_suffix".to_string(),
            hint: Some("Set 'org_suffix' to the staging namespace suffix, e.g. -preview".to_string()),
        });
    }
    if config.preview_orgs.is_empty() {
        return Err(Error::config("'preview_orgs' must list the staging organizations"));
    }
    for org in &config.preview_orgs {
        if !org.ends_with(&config.org_suffix) {
            return Err(Error::config(format!(
                "preview org '{}' does not end with org_suffix '{}'",
                org, config.org_suffix
            )));
        }
    }
    for repo in repos {
        if !config
            .preview_orgs
            .iter()
            .any(|org| org == repo.destination_org())
        {
            return Err(Error::config(format!(
                "{} is outside the preview organizations",
                repo.destination_full_name()
            )));
        }
    }
    Ok(())
}

/// Deletes the destination repositories, then recreates `repos`.
///
/// With `scoped` set only the repositories in `repos` are deleted; otherwise
/// the preview organizations are emptied. `pause` separates the two steps so
/// the forge can settle.
pub fn reset_preview(
    provider: &dyn HostingProvider,
    config: &Config,
    repos: &[Repository],
    scoped: bool,
    dry_run: bool,
    pause: Duration,
) -> Result<PreviewReport> {
    check_preview_scope(config, repos)?;
    let mut report = PreviewReport::default();

    let only: Option<HashSet<String>> =
        scoped.then(|| repos.iter().map(Repository::destination_full_name).collect());
    report.deleted = delete_repos(provider, &config.preview_orgs, only.as_ref(), dry_run)?;

    if !dry_run && !report.deleted.is_empty() && !pause.is_zero() {
        std::thread::sleep(pause);
    }

    create_repos(provider, repos, dry_run, &mut report)?;
    Ok(report)
}

fn delete_repos(
    provider: &dyn HostingProvider,
    orgs: &[String],
    only: Option<&HashSet<String>>,
    dry_run: bool,
) -> Result<Vec<String>> {
    let mut deleted = Vec::new();
    for org in orgs {
        info!("Deleting repos for org: {}{}", org, dry_run_tag(dry_run));
        for full_name in provider.list_repositories(org)? {
            if only.is_some_and(|names| !names.contains(&full_name)) {
                continue;
            }
            info!("Deleting {}{}", full_name, dry_run_tag(dry_run));
            if !dry_run {
                provider.delete_repository(&full_name)?;
            }
            deleted.push(full_name);
        }
    }
    Ok(deleted)
}

fn create_repos(
    provider: &dyn HostingProvider,
    repos: &[Repository],
    dry_run: bool,
    report: &mut PreviewReport,
) -> Result<()> {
    let mut existing: HashMap<String, HashSet<String>> = HashMap::new();

    for repo in repos {
        let full_name = repo.destination_full_name();
        info!("Creating new repo: {}{}", full_name, dry_run_tag(dry_run));
        if dry_run {
            report.created.push(full_name);
            continue;
        }

        let org = repo.destination_org();
        if !existing.contains_key(org) {
            let names = provider.list_repositories(org)?.into_iter().collect();
            existing.insert(org.to_string(), names);
        }
        let names = existing.entry(org.to_string()).or_default();
        if names.contains(&full_name) {
            info!("Repo {} already exists", full_name);
            report.already_present.push(full_name);
            continue;
        }

        provider.create_repository(org, repo.destination_name())?;
        names.insert(full_name.clone());
        report.created.push(full_name);
    }
    Ok(())
}

fn dry_run_tag(dry_run: bool) -> &'static str {
    if dry_run {
        " (DRY RUN)"
    } else {
        ""
    }
}
