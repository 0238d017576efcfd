//! # CLI Command Implementations
//!
//! Each subcommand of `repo-migrate` lives in its own file with:
//! - An `Args` struct deriving `clap::Args`.
//! - An `execute` function taking the parsed `Args` and calling into the
//!   `repo_migrate` library.
//!
//! Library errors are propagated unchanged inside `anyhow::Error` so `main`
//! can still tell configuration errors from run failures.

pub mod completions;
pub mod migrate;
pub mod preview;
pub mod validate;

use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use repo_migrate::branches;
use repo_migrate::config::{self, Config};
use repo_migrate::error::Error;
use repo_migrate::registry::Registry;
use repo_migrate::repository::Repository;

/// Loads the configuration and the repository table it points at.
pub(crate) fn load_registry(config_path: &Path) -> Result<(Config, Registry)> {
    let config = config::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let registry = Registry::load(
        &config.repos_csv_file_path,
        &config.org_suffix,
        &config.source_remote,
    )
    .with_context(|| format!("loading {}", config.repos_csv_file_path.display()))?;
    info!(
        "Loaded {} repositories ({} already hosted)",
        registry.all.len(),
        registry.hosted.len()
    );
    Ok((config, registry))
}

/// Reads the in-scope branches from the pipeline definition.
pub(crate) fn load_branches(config: &Config) -> Result<Vec<String>> {
    let path = &config.pipelines_file_path;
    let branches = branches::load_active_branches(path, &config.trigger_source)
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(branches)
}

/// Restricts `repos` to `single_repo`, failing when nothing matches.
pub(crate) fn restrict(
    repos: Vec<Repository>,
    single_repo: Option<&str>,
) -> Result<Vec<Repository>> {
    let Some(name) = single_repo else {
        return Ok(repos);
    };
    let filtered = repo_migrate::registry::filter_repos(&repos, &[name.to_string()]);
    if filtered.is_empty() {
        return Err(Error::Config {
            message: format!("no repository with source name '{}' to migrate", name),
            hint: Some("--single-repo takes the source short name, e.g. proj1".to_string()),
        }
        .into());
    }
    let names: Vec<String> = filtered.iter().map(ToString::to_string).collect();
    info!("Repos after filtering: {}", names.join("; "));
    Ok(filtered)
}
