//! # Repository Registry
//!
//! Loads the authoritative list of repositories to migrate from the
//! repository table. The table has two header rows followed by data rows of
//! exactly five fields:
//!
//! ```text
//! source org, source name, destination org, destination name, hosted
//! ```
//!
//! `hosted` is `yes` when the repository already lives on the destination
//! forge. Such repositories are never squashed or pushed but their names are
//! still rewritten wherever they are referenced.
//!
//! The whole table is validated before anything is returned, so a malformed
//! row aborts the run before any mirror is touched.

use crate::error::{Error, Result};
use crate::repository::Repository;
use regex::Regex;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

/// Header rows preceding the data rows.
pub const HEADER_ROWS: usize = 2;

/// Fields per data row.
pub const ROW_FIELDS: usize = 5;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("identifier pattern is valid"));

/// The repositories of one migration, in table order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Repositories routed through squash, rewrite and push.
    pub pipeline: Vec<Repository>,
    /// Repositories already hosted on the destination forge.
    pub hosted: Vec<Repository>,
    /// Every repository in load order.
    pub all: Vec<Repository>,
}

impl Registry {
    /// Loads the table at `path`, appending `org_suffix` to every destination
    /// organization and cloning mirrors from `source_remote`.
    pub fn load(path: &Path, org_suffix: &str, source_remote: &str) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| Error::Config {
            message: format!("cannot open repository table {}: {}", path.display(), e),
            hint: None,
        })?;
        Self::from_reader(file, org_suffix, source_remote)
    }

    /// Parses a repository table from any reader.
    pub fn from_reader<R: Read>(reader: R, org_suffix: &str, source_remote: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut registry = Registry::default();
        let mut seen_rows = 0usize;

        for record in csv_reader.records() {
            let record = record?;
            seen_rows += 1;
            if seen_rows <= HEADER_ROWS {
                continue;
            }

            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(seen_rows as u64);

            if record.len() != ROW_FIELDS {
                return Err(Error::Config {
                    message: format!(
                        "repository table line {}: expected {} fields, found {}",
                        line,
                        ROW_FIELDS,
                        record.len()
                    ),
                    hint: Some(
                        "Rows are: source org, source name, destination org, destination name, hosted (yes/no)"
                            .to_string(),
                    ),
                });
            }

            let field = |index: usize, column: &str| -> Result<String> {
                let value = &record[index];
                if !IDENTIFIER.is_match(value) {
                    return Err(Error::config(format!(
                        "repository table line {}: invalid {} '{}'",
                        line, column, value
                    )));
                }
                Ok(value.to_string())
            };

            let source_org = field(0, "source org")?;
            let source_name = field(1, "source name")?;
            let destination_org = format!("{}{}", field(2, "destination org")?, org_suffix);
            let destination_name = field(3, "destination name")?;
            let hosted = parse_flag(&record[4]).ok_or_else(|| {
                Error::config(format!(
                    "repository table line {}: hosted flag must be yes or no, found '{}'",
                    line, &record[4]
                ))
            })?;

            let repo = Repository::new(source_org, source_name, destination_org, destination_name)
                .with_source_remote(source_remote);

            if hosted {
                registry.hosted.push(repo.clone());
            } else {
                registry.pipeline.push(repo.clone());
            }
            registry.all.push(repo);
        }

        if seen_rows < HEADER_ROWS {
            return Err(Error::config(format!(
                "repository table has {} rows, expected at least {} header rows",
                seen_rows, HEADER_ROWS
            )));
        }

        Ok(registry)
    }

    /// Repositories to squash, sync and push, optionally restricted to
    /// source short names in `only`. Load order is preserved.
    pub fn select(&self, only: Option<&[String]>) -> Vec<Repository> {
        match only {
            Some(names) => filter_repos(&self.pipeline, names),
            None => self.pipeline.clone(),
        }
    }

    pub fn is_hosted(&self, repo: &Repository) -> bool {
        self.hosted.contains(repo)
    }
}

/// Keeps the repositories whose source short name is in `names`.
pub fn filter_repos(repos: &[Repository], names: &[String]) -> Vec<Repository> {
    repos
        .iter()
        .filter(|repo| names.iter().any(|name| name == repo.source_name()))
        .cloned()
        .collect()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" => Some(true),
        "no" | "n" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Source,,Destination,,
org,name,org,name,hosted
OldOrg,proj1,NewOrg,proj1-new,no
OldOrg,proj2,NewOrg,proj2,yes
Tools,helper,NewTools,helper,No
";

    fn load(table: &str, suffix: &str) -> Result<Registry> {
        Registry::from_reader(table.as_bytes(), suffix, "github.com")
    }

    #[test]
    fn test_load_splits_hosted_and_pipeline() {
        let registry = load(TABLE, "").unwrap();
        assert_eq!(registry.all.len(), 3);
        assert_eq!(registry.pipeline.len(), 2);
        assert_eq!(registry.hosted.len(), 1);
        assert_eq!(registry.hosted[0].source_full_name(), "OldOrg/proj2");
        assert!(registry.is_hosted(&registry.all[1]));
        assert!(!registry.is_hosted(&registry.all[0]));
    }

    #[test]
    fn test_load_preserves_order() {
        let registry = load(TABLE, "").unwrap();
        let names: Vec<_> = registry.all.iter().map(|r| r.source_name()).collect();
        assert_eq!(names, vec!["proj1", "proj2", "helper"]);
    }

    #[test]
    fn test_org_suffix_applies_to_destination_only() {
        let registry = load(TABLE, "-preview").unwrap();
        let repo = &registry.all[0];
        assert_eq!(repo.source_org(), "OldOrg");
        assert_eq!(repo.destination_full_name(), "NewOrg-preview/proj1-new");
    }

    #[test]
    fn test_four_field_row_is_config_error() {
        let table = "h1\nh2\nOldOrg,proj1,NewOrg,proj1-new\n";
        let err = load(table, "").unwrap_err();
        assert!(err.is_config());
        let display = err.to_string();
        assert!(display.contains("expected 5 fields, found 4"));
        assert!(display.contains("line 3"));
    }

    #[test]
    fn test_missing_header_rows_is_config_error() {
        let err = load("only one header\n", "").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("header rows"));
    }

    #[test]
    fn test_headers_without_data_is_empty_registry() {
        let registry = load("h1\nh2\n", "").unwrap();
        assert!(registry.all.is_empty());
    }

    #[test]
    fn test_empty_destination_name_rejected() {
        let table = "h1\nh2\nOldOrg,proj1,NewOrg,,no\n";
        let err = load(table, "").unwrap_err();
        assert!(err.to_string().contains("destination name"));
    }

    #[test]
    fn test_delimiter_in_identifier_rejected() {
        let table = "h1\nh2\nOld:Org,proj1,NewOrg,proj1,no\n";
        let err = load(table, "").unwrap_err();
        assert!(err.to_string().contains("source org"));
    }

    #[test]
    fn test_bad_flag_rejected() {
        let table = "h1\nh2\nOldOrg,proj1,NewOrg,proj1,maybe\n";
        let err = load(table, "").unwrap_err();
        assert!(err.to_string().contains("yes or no"));
    }

    #[test]
    fn test_select_filters_by_source_short_name() {
        let registry = load(TABLE, "").unwrap();
        let only = vec!["helper".to_string(), "proj2".to_string()];
        let selected = registry.select(Some(&only));
        // proj2 is hosted and never selected for the pipeline
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].source_full_name(), "Tools/helper");

        assert_eq!(registry.select(None).len(), 2);
    }

    #[test]
    fn test_filter_repos_ignores_destination_name() {
        let registry = load(TABLE, "").unwrap();
        let selected = filter_repos(&registry.all, &["proj1-new".to_string()]);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = Registry::load(Path::new("/nonexistent/repos.csv"), "", "github.com").unwrap_err();
        assert!(err.is_config());
    }
}
