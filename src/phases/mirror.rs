//! Stage 1: Mirror Sync
//!
//! Brings the local mirror of each repository up to date. A healthy mirror is
//! updated with `fetch --all` and `pull`; a missing mirror is cloned; a path
//! that exists but is not a repository is removed and cloned again.
//!
//! A mirror that exists but fails to fetch for any other reason (network,
//! authentication, a pull that does not fast-forward) is reported as a
//! failure and left alone, so whatever is wrong with it can be inspected.
//!
//! Mirrors are independent of each other and are synced in parallel with
//! rayon. Repositories sharing a mirror path are synced once.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::git::{is_not_a_repository, GitOperations, MirrorState};
use crate::repository::Repository;

/// How a mirror was brought up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Existing mirror fetched and pulled.
    Updated,
    /// No mirror existed; cloned.
    Cloned,
    /// An unusable mirror was removed and cloned again.
    Recloned,
}

/// Syncs the mirror of `repo` below `mirror_root`.
///
/// With `full_reclone` the mirror is deleted first; deleting a mirror that
/// does not exist is not an error.
pub fn sync_mirror(
    git: &dyn GitOperations,
    mirror_root: &Path,
    repo: &Repository,
    full_reclone: bool,
) -> Result<SyncOutcome> {
    let path = repo.mirror_path(mirror_root);
    let sync_error = |message: String| Error::MirrorSync {
        repo: repo.source_full_name(),
        message,
    };

    if full_reclone {
        info!("Removing repo dir: {}", path.display());
        remove_path(&path).map_err(|e| sync_error(format!("cannot remove {}: {}", path.display(), e)))?;
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| sync_error(format!("cannot create {}: {}", parent.display(), e)))?;
    }

    match git.probe(&path) {
        MirrorState::Healthy => {
            info!("Syncing {} in {}", repo.source_full_name(), path.display());
            match git.fetch_all(&path).and_then(|_| git.pull(&path)) {
                Ok(()) => Ok(SyncOutcome::Updated),
                Err(e) if is_not_a_repository(&e) => {
                    warn!("{} is not a usable repository, recloning", path.display());
                    reclone(git, repo, &path)
                }
                Err(e) => Err(sync_error(e.to_string())),
            }
        }
        MirrorState::Invalid => {
            warn!("{} is not a valid repository, recloning", path.display());
            reclone(git, repo, &path)
        }
        MirrorState::Missing => {
            clone(git, repo, &path)?;
            Ok(SyncOutcome::Cloned)
        }
    }
}

fn reclone(git: &dyn GitOperations, repo: &Repository, path: &Path) -> Result<SyncOutcome> {
    remove_path(path).map_err(|e| Error::MirrorSync {
        repo: repo.source_full_name(),
        message: format!("cannot remove {}: {}", path.display(), e),
    })?;
    clone(git, repo, path)?;
    Ok(SyncOutcome::Recloned)
}

fn clone(git: &dyn GitOperations, repo: &Repository, path: &Path) -> Result<()> {
    let url = repo.source_url();
    info!("Cloning {} into {}", url, path.display());
    git.clone_repo(&url, path).map_err(|e| Error::MirrorSync {
        repo: repo.source_full_name(),
        message: e.to_string(),
    })
}

/// Removes a file or directory tree. A missing path is not an error.
fn remove_path(path: &Path) -> io::Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Syncs every distinct mirror of `repos`, using up to `jobs` workers.
///
/// Results come back in `repos` order, one per distinct mirror path.
pub fn sync_all(
    git: &dyn GitOperations,
    mirror_root: &Path,
    repos: &[Repository],
    full_reclone: bool,
    jobs: Option<usize>,
) -> Result<Vec<(Repository, Result<SyncOutcome>)>> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let distinct: Vec<&Repository> = repos
        .iter()
        .filter(|repo| {
            let fresh = seen.insert(repo.mirror_path(mirror_root));
            if !fresh {
                debug!("{} shares a mirror already being synced", repo.source_full_name());
            }
            fresh
        })
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.unwrap_or(0))
        .build()
        .map_err(|e| Error::config(format!("cannot start mirror sync workers: {}", e)))?;

    Ok(pool.install(|| {
        distinct
            .par_iter()
            .map(|repo| {
                let result = sync_mirror(git, mirror_root, repo, full_reclone);
                ((*repo).clone(), result)
            })
            .collect()
    }))
}
