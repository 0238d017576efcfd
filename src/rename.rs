//! # Rename Table
//!
//! Maps every old repository identifier to its new identifier, in both the
//! bare `org/name` form and the fully-qualified `host/org/name` form.
//!
//! Entries are ordered by descending length of the old identifier. Applying
//! them in that order means `gerrit.example.com/OldOrg/proj1` is rewritten as
//! a whole before the bare `OldOrg/proj1` entry gets a chance to rewrite the
//! tail of it.

use crate::config::Config;
use crate::registry::Registry;
use std::fmt;

/// One literal substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEntry {
    pub old: String,
    pub new: String,
}

impl RenameEntry {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }
}

impl fmt::Display for RenameEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.old, self.new)
    }
}

/// Rename entries in application order.
#[derive(Debug, Clone, Default)]
pub struct RenameTable {
    entries: Vec<RenameEntry>,
}

impl RenameTable {
    /// Orders `entries` longest old identifier first.
    ///
    /// The sort is stable and exact duplicates are dropped, so among
    /// equal-length identifiers the first one supplied wins.
    pub fn new(entries: impl IntoIterator<Item = RenameEntry>) -> Self {
        let mut unique: Vec<RenameEntry> = Vec::new();
        for entry in entries {
            if entry.old != entry.new && !unique.iter().any(|e| e.old == entry.old) {
                unique.push(entry);
            }
        }
        unique.sort_by(|a, b| b.old.len().cmp(&a.old.len()));
        Self { entries: unique }
    }

    /// Builds the table for every repository in `registry`.
    ///
    /// Pipeline repositories are qualified with `old_hostname`; repositories
    /// already on the destination forge with `source_remote`. New identifiers
    /// are always qualified with `new_hostname`.
    pub fn build(registry: &Registry, config: &Config) -> Self {
        let qualified = |old_host: &str, repo: &crate::repository::Repository| {
            RenameEntry::new(
                format!("{}/{}", old_host, repo.source_full_name()),
                format!("{}/{}", config.new_hostname, repo.destination_full_name()),
            )
        };
        let bare = |repo: &crate::repository::Repository| {
            RenameEntry::new(repo.source_full_name(), repo.destination_full_name())
        };

        let entries = registry
            .pipeline
            .iter()
            .map(bare)
            .chain(registry.hosted.iter().map(bare))
            .chain(
                registry
                    .pipeline
                    .iter()
                    .map(|repo| qualified(&config.old_hostname, repo)),
            )
            .chain(
                registry
                    .hosted
                    .iter()
                    .map(|repo| qualified(&config.source_remote, repo)),
            );

        Self::new(entries)
    }

    pub fn entries(&self) -> &[RenameEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies every entry, in order, to `text`.
    pub fn rewrite(&self, text: &str) -> String {
        self.entries
            .iter()
            .fold(text.to_string(), |acc, entry| acc.replace(&entry.old, &entry.new))
    }

    /// Byte-level [`rewrite`](Self::rewrite). Returns `None` when nothing
    /// matched.
    pub fn rewrite_bytes(&self, content: &[u8]) -> Option<Vec<u8>> {
        let mut current: Option<Vec<u8>> = None;
        for entry in &self.entries {
            let haystack = current.as_deref().unwrap_or(content);
            if let Some(replaced) = replace_bytes(haystack, entry.old.as_bytes(), entry.new.as_bytes())
            {
                current = Some(replaced);
            }
        }
        current
    }
}

/// Replaces every non-overlapping occurrence of `from`, left to right.
pub(crate) fn replace_bytes(haystack: &[u8], from: &[u8], to: &[u8]) -> Option<Vec<u8>> {
    if from.is_empty() || haystack.len() < from.len() {
        return None;
    }

    let mut out = Vec::with_capacity(haystack.len());
    let mut start = 0;
    let mut index = 0;
    let mut matched = false;

    while index + from.len() <= haystack.len() {
        if &haystack[index..index + from.len()] == from {
            out.extend_from_slice(&haystack[start..index]);
            out.extend_from_slice(to);
            index += from.len();
            start = index;
            matched = true;
        } else {
            index += 1;
        }
    }

    if !matched {
        return None;
    }
    out.extend_from_slice(&haystack[start..]);
    Some(out)
}
