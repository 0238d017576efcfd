//! # Branch Selector
//!
//! Extracts the in-scope branches from the CI pipeline definition. Only
//! branches gating the `check` and `gate` pipelines are migrated; every other
//! branch is left behind.
//!
//! The definition is a YAML sequence of records. Records other than
//! `pipeline` (jobs, projects, ...) are ignored:
//!
//! ```yaml
//! - pipeline:
//!     name: check
//!     trigger:
//!       gerrit:
//!         - event: patchset-created
//!           branch:
//!             - ^master$
//!             - ^stable/2019$
//! ```
//!
//! Branch patterns are anchored regexes; the selector strips exactly one
//! character from each end to recover the plain branch name.

use crate::error::{Error, Result};
use log::warn;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Pipelines whose triggers define the in-scope branches.
pub const SELECTED_PIPELINES: [&str; 2] = ["check", "gate"];

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(default)]
    pipeline: Option<Pipeline>,
}

#[derive(Debug, Deserialize)]
struct Pipeline {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    trigger: BTreeMap<String, Vec<TriggerRule>>,
}

#[derive(Debug, Deserialize)]
struct TriggerRule {
    #[serde(default)]
    branch: BranchPatterns,
}

/// `branch:` accepts a single pattern or a list.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum BranchPatterns {
    One(String),
    Many(Vec<String>),
    #[default]
    None,
}

impl BranchPatterns {
    fn iter(&self) -> impl Iterator<Item = &String> {
        let slice: &[String] = match self {
            BranchPatterns::One(pattern) => std::slice::from_ref(pattern),
            BranchPatterns::Many(patterns) => patterns,
            BranchPatterns::None => &[],
        };
        slice.iter()
    }
}

/// Reads the pipeline definition at `path`.
pub fn load_active_branches(path: &Path, trigger_source: &str) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("cannot read pipeline definition {}: {}", path.display(), e),
        hint: None,
    })?;
    active_branches(&content, trigger_source)
}

/// Extracts the deduplicated, sorted branch names gating `check` and `gate`.
pub fn active_branches(yaml_content: &str, trigger_source: &str) -> Result<Vec<String>> {
    let records: Vec<Record> = serde_yaml::from_str(yaml_content)?;
    let mut branches = BTreeSet::new();

    let pipelines = records
        .iter()
        .filter_map(|record| record.pipeline.as_ref())
        .filter(|pipeline| {
            pipeline
                .name
                .as_deref()
                .is_some_and(|name| SELECTED_PIPELINES.contains(&name))
        });

    for pipeline in pipelines {
        let rules = pipeline.trigger.get(trigger_source).into_iter().flatten();
        for pattern in rules.flat_map(|rule| rule.branch.iter()) {
            match strip_delimiters(pattern) {
                Some(branch) => {
                    branches.insert(branch.to_string());
                }
                None => warn!("Ignoring branch pattern '{}': nothing left after stripping", pattern),
            }
        }
    }

    Ok(branches.into_iter().collect())
}

/// Drops exactly one leading and one trailing character.
fn strip_delimiters(pattern: &str) -> Option<&str> {
    let mut chars = pattern.chars();
    chars.next()?;
    chars.next_back()?;
    let inner = chars.as_str();
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}
