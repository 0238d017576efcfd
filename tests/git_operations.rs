//! Tests for `DefaultGitOperations` and mirror sync against a real git binary.
//!
//! Gated behind the `integration-tests` feature:
//!
//! ```bash
//! cargo test --features integration-tests --test git_operations
//! ```
//!
//! Source repositories are local bare repositories. `https://github.com/` is
//! redirected to them with a `url.<base>.insteadOf` rule passed through
//! `GIT_CONFIG_*` environment variables, so no network access is needed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use repo_migrate::error::Error;
use repo_migrate::git::{
    CommitOutcome, DefaultGitOperations, GitOperations, MirrorState, RemoteOutcome,
};
use repo_migrate::phases::mirror::{sync_mirror, SyncOutcome};
use repo_migrate::repository::Repository;
use tempfile::TempDir;

const IDENTITY: [(&str, &str); 4] = [
    ("GIT_AUTHOR_NAME", "Test"),
    ("GIT_AUTHOR_EMAIL", "test@example.com"),
    ("GIT_COMMITTER_NAME", "Test"),
    ("GIT_COMMITTER_EMAIL", "test@example.com"),
];

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .envs(IDENTITY)
        .output()
        .expect("git must be installed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Creates `<sources>/OldOrg/proj1` as a bare repository with one commit on
/// `master`.
fn seed_source(sources: &Path) -> PathBuf {
    let work = sources.join("work");
    fs::create_dir_all(&work).unwrap();
    git(&work, &["init", "-q", "-b", "master"]);
    fs::write(work.join("README"), "proj1\n").unwrap();
    git(&work, &["add", "-A"]);
    git(&work, &["commit", "-q", "-m", "initial"]);

    let bare = sources.join("OldOrg/proj1");
    fs::create_dir_all(bare.parent().unwrap()).unwrap();
    git(
        sources,
        &["clone", "-q", "--bare", work.to_str().unwrap(), bare.to_str().unwrap()],
    );
    work
}

/// Git operations that resolve `https://github.com/<org>/<name>` to
/// `<sources>/<org>/<name>`.
fn redirected_git(sources: &Path) -> DefaultGitOperations {
    let mut env: Vec<(String, String)> = IDENTITY
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    env.extend([
        ("GIT_CONFIG_COUNT".to_string(), "1".to_string()),
        (
            "GIT_CONFIG_KEY_0".to_string(),
            format!("url.file://{}/.insteadOf", sources.display()),
        ),
        (
            "GIT_CONFIG_VALUE_0".to_string(),
            "https://github.com/".to_string(),
        ),
    ]);
    DefaultGitOperations::new(env)
}

fn proj1() -> Repository {
    Repository::new("OldOrg", "proj1", "NewOrg", "proj1-new")
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_clone_into_relative_root_lands_at_mirror_path() {
    let sources = TempDir::new().unwrap();
    seed_source(sources.path());
    let git = redirected_git(sources.path());

    // Integration tests run from the package root, so a directory created
    // there can be named relatively.
    let cwd = std::env::current_dir().unwrap();
    let root = tempfile::Builder::new()
        .prefix("mirrors-")
        .tempdir_in(&cwd)
        .unwrap();
    let relative_root = root.path().strip_prefix(&cwd).unwrap();
    assert!(relative_root.is_relative());

    let outcome = sync_mirror(&git, relative_root, &proj1(), false).unwrap();

    assert_eq!(outcome, SyncOutcome::Cloned);
    let mirror = root.path().join("github.com/OldOrg/proj1");
    assert!(mirror.join("README").is_file());
    assert_eq!(git.probe(&mirror), MirrorState::Healthy);
    assert!(!root.path().join("github.com/OldOrg/github.com").exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_clone_into_absolute_root_then_second_sync_updates() {
    let sources = TempDir::new().unwrap();
    let work = seed_source(sources.path());
    let root = TempDir::new().unwrap();
    let git = redirected_git(sources.path());

    assert_eq!(
        sync_mirror(&git, root.path(), &proj1(), false).unwrap(),
        SyncOutcome::Cloned
    );

    // A new upstream commit arrives through fetch and pull, not a clone.
    fs::write(work.join("CHANGES"), "more\n").unwrap();
    git_in_work(&work, sources.path());
    assert_eq!(
        sync_mirror(&git, root.path(), &proj1(), false).unwrap(),
        SyncOutcome::Updated
    );

    let mirror = proj1().mirror_path(root.path());
    assert!(mirror.join("CHANGES").is_file());
    let refs = git.remote_refs(&mirror).unwrap();
    assert!(refs.has_origin_branch("master"));
    assert_eq!(git.current_branch(&mirror).unwrap(), "master");
}

/// Commits everything in `work` and pushes it to the bare source.
fn git_in_work(work: &Path, sources: &Path) {
    git(work, &["add", "-A"]);
    git(work, &["commit", "-q", "-m", "more"]);
    let bare = sources.join("OldOrg/proj1");
    git(work, &["push", "-q", bare.to_str().unwrap(), "master"]);
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_full_reclone_of_healthy_mirror_clones_again() {
    let sources = TempDir::new().unwrap();
    seed_source(sources.path());
    let root = TempDir::new().unwrap();
    let git = redirected_git(sources.path());
    sync_mirror(&git, root.path(), &proj1(), false).unwrap();
    let mirror = proj1().mirror_path(root.path());
    fs::write(mirror.join("local-only"), "x").unwrap();

    let outcome = sync_mirror(&git, root.path(), &proj1(), true).unwrap();

    assert_eq!(outcome, SyncOutcome::Cloned);
    assert!(!mirror.join("local-only").exists());
    assert!(mirror.join("README").is_file());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_directory_without_checkout_is_recloned() {
    let sources = TempDir::new().unwrap();
    seed_source(sources.path());
    let root = TempDir::new().unwrap();
    let mirror = proj1().mirror_path(root.path());
    fs::create_dir_all(&mirror).unwrap();
    fs::write(mirror.join("junk"), "x").unwrap();
    let git = redirected_git(sources.path());

    let outcome = sync_mirror(&git, root.path(), &proj1(), false).unwrap();

    assert_eq!(outcome, SyncOutcome::Recloned);
    assert!(!mirror.join("junk").exists());
    assert!(mirror.join("README").is_file());
}

#[cfg(unix)]
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_unrunnable_git_leaves_healthy_mirror_untouched() {
    let sources = TempDir::new().unwrap();
    seed_source(sources.path());
    let root = TempDir::new().unwrap();
    sync_mirror(&redirected_git(sources.path()), root.path(), &proj1(), false).unwrap();
    let mirror = proj1().mirror_path(root.path());
    fs::write(mirror.join("precious-local-work"), "keep me").unwrap();

    let broken = DefaultGitOperations::new(vec![("PATH".to_string(), String::new())]);
    let err = sync_mirror(&broken, root.path(), &proj1(), false).unwrap_err();

    assert!(matches!(err, Error::MirrorSync { .. }));
    assert!(err.to_string().contains("fetch"));
    assert_eq!(
        fs::read_to_string(mirror.join("precious-local-work")).unwrap(),
        "keep me"
    );
    assert!(mirror.join(".git").is_dir());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_commit_reports_clean_tree() {
    let sources = TempDir::new().unwrap();
    seed_source(sources.path());
    let root = TempDir::new().unwrap();
    let git = redirected_git(sources.path());
    sync_mirror(&git, root.path(), &proj1(), false).unwrap();
    let mirror = proj1().mirror_path(root.path());

    git.add_all(&mirror).unwrap();
    assert_eq!(git.commit(&mirror, ".").unwrap(), CommitOutcome::NothingToCommit);

    fs::write(mirror.join("README"), "rewritten\n").unwrap();
    git.add_all(&mirror).unwrap();
    assert_eq!(git.commit(&mirror, ".").unwrap(), CommitOutcome::Committed);
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_remote_add_twice_and_repoint() {
    let sources = TempDir::new().unwrap();
    seed_source(sources.path());
    let root = TempDir::new().unwrap();
    let git = redirected_git(sources.path());
    sync_mirror(&git, root.path(), &proj1(), false).unwrap();
    let mirror = proj1().mirror_path(root.path());

    let first = "ssh://git@github.com/NewOrg-preview/proj1-new";
    let second = "ssh://git@github.com/NewOrg/proj1-new";
    assert_eq!(git.remote_add(&mirror, "new", first).unwrap(), RemoteOutcome::Added);
    assert_eq!(
        git.remote_add(&mirror, "new", second).unwrap(),
        RemoteOutcome::AlreadyExists
    );
    assert_eq!(git.remote_url(&mirror, "new").unwrap(), first);

    git.set_remote_url(&mirror, "new", second).unwrap();
    assert_eq!(git.remote_url(&mirror, "new").unwrap(), second);
}
