//! # Configuration
//!
//! This module defines the `config.yaml` document that drives a migration run
//! and the logic for loading it. The document is parsed once at startup into an
//! immutable [`Config`] value which is then passed by reference to every stage.
//!
//! ## Example
//!
//! ```yaml
//! gitdir: /srv/mirrors
//! old_hostname: gerrit.example.com
//! new_hostname: github.com
//! repos_csv_file_path: repos.csv
//! pipelines_file_path: zuul/pipelines.yaml
//! anchor_repo: OldOrg/project-config
//! org_suffix: -preview
//! skip_branches:
//!   OldOrg/proj1: [stable/2018]
//! ```
//!
//! Everything except the host names, the two input file paths and the anchor
//! repository has a default.

use crate::error::{Error, Result};
use crate::repository::{Repository, DEFAULT_SOURCE_REMOTE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Parsed `config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory holding every local mirror.
    #[serde(default = "crate::defaults::default_gitdir")]
    pub gitdir: PathBuf,

    /// Host the repositories are being migrated away from (e.g. a Gerrit
    /// server). Used for fully-qualified rename identifiers and the anchor
    /// mirror location.
    pub old_hostname: String,

    /// Host the repositories are being migrated to.
    pub new_hostname: String,

    /// Host mirrors are cloned from. Repositories already living on the
    /// destination forge are also identified under this host.
    #[serde(default = "default_source_remote")]
    pub source_remote: String,

    /// Path to the repository table.
    pub repos_csv_file_path: PathBuf,

    /// Path to the pipeline/trigger definition.
    pub pipelines_file_path: PathBuf,

    /// Event source whose trigger rules carry branch patterns.
    #[serde(default = "default_trigger_source")]
    pub trigger_source: String,

    /// Source full name (`org/name`) → branches never squashed or pushed.
    #[serde(default)]
    pub skip_branches: BTreeMap<String, Vec<String>>,

    /// Appended to every destination organization.
    #[serde(default)]
    pub org_suffix: String,

    /// Whether mirrors are synced at all.
    #[serde(default = "default_true")]
    pub clone: bool,

    /// Source full name of the repository rewritten to reference the new names.
    #[serde(default)]
    pub anchor_repo: String,

    #[serde(default = "default_anchor_branch")]
    pub anchor_branch: String,

    /// Directory holding `<repo short name>.patch` files.
    #[serde(default = "default_patches_dir")]
    pub patches_dir: PathBuf,

    /// Executable collapsing a branch's history, run inside the mirror.
    #[serde(default = "default_squash_script")]
    pub squash_script: PathBuf,

    /// Optional executable replacing the built-in tree substitution. Invoked
    /// as `<script> <old> <new> <root>`.
    #[serde(default)]
    pub substitute_script: Option<PathBuf>,

    /// Private key used for git over SSH.
    #[serde(default)]
    pub ssh_key: Option<PathBuf>,

    /// Name of the remote pointing at the destination repository.
    #[serde(default = "default_new_remote_name")]
    pub new_remote_name: String,

    #[serde(default = "default_push_url_base")]
    pub push_url_base: String,

    /// Message of the anchor rewrite commit.
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Worker count for mirror sync. Defaults to the number of CPUs.
    #[serde(default)]
    pub jobs: Option<usize>,

    #[serde(default)]
    pub github_login: String,

    /// Personal access token for the hosting API.
    #[serde(default)]
    pub github_password: String,

    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Staging organizations wiped by the `preview` command.
    #[serde(default)]
    pub preview_orgs: Vec<String>,
}

fn default_source_remote() -> String {
    DEFAULT_SOURCE_REMOTE.to_string()
}

fn default_trigger_source() -> String {
    "gerrit".to_string()
}

fn default_true() -> bool {
    true
}

fn default_anchor_branch() -> String {
    "master".to_string()
}

fn default_patches_dir() -> PathBuf {
    PathBuf::from("patches")
}

fn default_squash_script() -> PathBuf {
    PathBuf::from("squash.sh")
}

fn default_new_remote_name() -> String {
    "new".to_string()
}

fn default_push_url_base() -> String {
    "ssh://git@github.com".to_string()
}

fn default_commit_message() -> String {
    ".".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Config {
    /// Parses and validates a YAML document.
    pub fn parse(yaml_content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml_content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("old_hostname", &self.old_hostname),
            ("new_hostname", &self.new_hostname),
            ("source_remote", &self.source_remote),
            ("new_remote_name", &self.new_remote_name),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config(format!("'{}' must not be empty", key)));
            }
        }

        if split_full_name(&self.anchor_repo).is_none() {
            return Err(Error::Config {
                message: format!("invalid anchor_repo '{}'", self.anchor_repo),
                hint: Some("Set 'anchor_repo' to the source org/name of the project-config repository".to_string()),
            });
        }

        if self.new_remote_name == "origin" {
            return Err(Error::Config {
                message: "new_remote_name must differ from the source remote 'origin'".to_string(),
                hint: None,
            });
        }

        if self.jobs == Some(0) {
            return Err(Error::config("'jobs' must be at least 1"));
        }

        Ok(())
    }

    /// The anchor repository as a [`Repository`], mirrored under the old host.
    pub fn anchor_repository(&self) -> Result<Repository> {
        let (org, name) = split_full_name(&self.anchor_repo)
            .ok_or_else(|| Error::config(format!("invalid anchor_repo '{}'", self.anchor_repo)))?;
        Ok(Repository::new(org, name, org, name).with_source_remote(&self.old_hostname))
    }

    /// Patch applied to `repo` before rewriting, if one is expected.
    pub fn patch_path(&self, repo: &Repository) -> PathBuf {
        self.patches_dir
            .join(format!("{}.patch", repo.source_name()))
    }

    /// URL of the destination remote for `repo`.
    pub fn push_url(&self, repo: &Repository) -> String {
        format!(
            "{}/{}",
            self.push_url_base.trim_end_matches('/'),
            repo.destination_full_name()
        )
    }

    /// Extra environment for git and script subprocesses.
    pub fn subprocess_env(&self) -> Vec<(String, String)> {
        match &self.ssh_key {
            Some(key) => vec![(
                "GIT_SSH_COMMAND".to_string(),
                format!("ssh -i {} -o IdentitiesOnly=yes", key.display()),
            )],
            None => Vec::new(),
        }
    }

    /// Makes every relative path in the document relative to `base`, the
    /// directory holding the config file.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.gitdir,
            &mut self.repos_csv_file_path,
            &mut self.pipelines_file_path,
            &mut self.patches_dir,
            &mut self.squash_script,
        ] {
            rebase(path, base);
        }
        for path in [&mut self.substitute_script, &mut self.ssh_key]
            .into_iter()
            .flatten()
        {
            rebase(path, base);
        }
    }

    pub fn skip_policy(&self) -> SkipPolicy {
        SkipPolicy::new(self.skip_branches.clone())
    }
}

/// Loads and validates a configuration file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    let mut config = Config::parse(&content)?;
    let base = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::path::absolute(dir)?,
        _ => std::env::current_dir()?,
    };
    config.resolve_paths(&base);
    Ok(config)
}

fn rebase(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    let (org, name) = full_name.split_once('/')?;
    if org.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((org, name))
}

/// Branches excluded from squashing and pushing, per repository.
///
/// Keys are source full names.
#[derive(Debug, Clone, Default)]
pub struct SkipPolicy {
    skipped: BTreeMap<String, BTreeSet<String>>,
}

impl SkipPolicy {
    pub fn new(skip_branches: BTreeMap<String, Vec<String>>) -> Self {
        let skipped = skip_branches
            .into_iter()
            .map(|(repo, branches)| (repo, branches.into_iter().collect()))
            .collect();
        Self { skipped }
    }

    pub fn is_skipped(&self, repo: &Repository, branch: &str) -> bool {
        self.skipped
            .get(&repo.source_full_name())
            .is_some_and(|branches| branches.contains(branch))
    }
}
