//! # Repository Identity
//!
//! A `Repository` is the immutable identity of one repository being migrated:
//! where it lives today (source remote, organization, name) and where it is
//! going (destination organization and name).
//!
//! The local mirror path is derived from the source half of the identity only.
//! Renaming a repository's destination between runs therefore never moves or
//! orphans its mirror.

use std::fmt;
use std::path::{Path, PathBuf};

/// Clone host used when a repository does not name one explicitly.
pub const DEFAULT_SOURCE_REMOTE: &str = "github.com";

/// Immutable identity of a repository taking part in a migration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    source_org: String,
    source_name: String,
    destination_org: String,
    destination_name: String,
    source_remote: String,
}

impl Repository {
    /// Creates a repository hosted on [`DEFAULT_SOURCE_REMOTE`].
    pub fn new(
        source_org: impl Into<String>,
        source_name: impl Into<String>,
        destination_org: impl Into<String>,
        destination_name: impl Into<String>,
    ) -> Self {
        Self {
            source_org: source_org.into(),
            source_name: source_name.into(),
            destination_org: destination_org.into(),
            destination_name: destination_name.into(),
            source_remote: DEFAULT_SOURCE_REMOTE.to_string(),
        }
    }

    /// Returns the same identity cloned from a different host.
    pub fn with_source_remote(mut self, source_remote: impl Into<String>) -> Self {
        self.source_remote = source_remote.into();
        self
    }

    pub fn source_org(&self) -> &str {
        &self.source_org
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn destination_org(&self) -> &str {
        &self.destination_org
    }

    pub fn destination_name(&self) -> &str {
        &self.destination_name
    }

    pub fn source_remote(&self) -> &str {
        &self.source_remote
    }

    /// `org/name` on the source side.
    pub fn source_full_name(&self) -> String {
        format!("{}/{}", self.source_org, self.source_name)
    }

    /// `org/name` on the destination side.
    pub fn destination_full_name(&self) -> String {
        format!("{}/{}", self.destination_org, self.destination_name)
    }

    /// HTTPS URL the mirror is cloned from.
    pub fn source_url(&self) -> String {
        format!("https://{}/{}", self.source_remote, self.source_full_name())
    }

    /// Location of this repository's mirror below `mirror_root`.
    ///
    /// Layout is `<root>/<source remote>/<source org>/<source name>`.
    pub fn mirror_path(&self, mirror_root: &Path) -> PathBuf {
        mirror_root
            .join(&self.source_remote)
            .join(&self.source_org)
            .join(&self.source_name)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "old: {}, new: {}",
            self.source_full_name(),
            self.destination_full_name()
        )
    }
}
