//! # Tree Substitution
//!
//! Rewrites old identifiers to new ones across every regular file of a
//! working tree, skipping `.git`. Substitution is literal: identifiers are
//! never interpreted as patterns.
//!
//! Two implementations are provided:
//!
//! - [`NativeSubstituter`] walks the tree once and applies the whole
//!   [`RenameTable`] to each file in memory. It works on bytes, so files that
//!   are not UTF-8 are handled like any other.
//! - [`ScriptSubstituter`] hands each entry to an external executable. Such
//!   scripts conventionally build a `s:old:new:g` expression, so identifiers
//!   containing [`SCRIPT_DELIMITER`] are refused before the script runs.

use crate::error::{Error, Result};
use crate::rename::{replace_bytes, RenameEntry, RenameTable};
use crate::tools::ExternalTool;
use log::{debug, info};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Field separator assumed by substitution scripts.
pub const SCRIPT_DELIMITER: char = ':';

/// Applies rename entries to a working tree.
pub trait TreeSubstituter: Send + Sync {
    /// Applies one entry to every file below `root`.
    fn substitute(&self, root: &Path, entry: &RenameEntry) -> Result<()>;

    /// Applies the whole table in order.
    fn substitute_all(&self, root: &Path, table: &RenameTable) -> Result<()> {
        for entry in table.entries() {
            self.substitute(root, entry)?;
        }
        Ok(())
    }
}

/// In-process substitution.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSubstituter;

impl NativeSubstituter {
    /// Visits every regular file outside `.git`, writing back the ones
    /// `rewrite` changed. Returns the number of files written.
    fn rewrite_tree<F>(&self, root: &Path, rewrite: F) -> Result<usize>
    where
        F: Fn(&[u8]) -> Option<Vec<u8>>,
    {
        let mut changed = 0;
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || entry.file_name() != ".git");

        for entry in walker {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let content = fs::read(entry.path())?;
            if let Some(rewritten) = rewrite(&content) {
                debug!("rewrote {}", entry.path().display());
                fs::write(entry.path(), rewritten)?;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

impl TreeSubstituter for NativeSubstituter {
    fn substitute(&self, root: &Path, entry: &RenameEntry) -> Result<()> {
        self.rewrite_tree(root, |content| {
            replace_bytes(content, entry.old.as_bytes(), entry.new.as_bytes())
        })?;
        Ok(())
    }

    fn substitute_all(&self, root: &Path, table: &RenameTable) -> Result<()> {
        let changed = self.rewrite_tree(root, |content| table.rewrite_bytes(content))?;
        info!("Rewrote {} file(s) under {}", changed, root.display());
        Ok(())
    }
}

/// Substitution delegated to `<script> <old> <new> <root>`.
pub struct ScriptSubstituter {
    tool: Box<dyn ExternalTool>,
}

impl ScriptSubstituter {
    pub fn new(tool: Box<dyn ExternalTool>) -> Self {
        Self { tool }
    }
}

impl TreeSubstituter for ScriptSubstituter {
    fn substitute(&self, root: &Path, entry: &RenameEntry) -> Result<()> {
        check_delimiter(entry)?;
        let root_arg = root.to_string_lossy();
        self.tool
            .run(root, &[entry.old.as_str(), entry.new.as_str(), root_arg.as_ref()])
    }

    fn substitute_all(&self, root: &Path, table: &RenameTable) -> Result<()> {
        // Refuse the whole table up front rather than leave it half applied.
        for entry in table.entries() {
            check_delimiter(entry)?;
        }
        for entry in table.entries() {
            self.substitute(root, entry)?;
        }
        Ok(())
    }
}

fn check_delimiter(entry: &RenameEntry) -> Result<()> {
    if entry.old.contains(SCRIPT_DELIMITER) || entry.new.contains(SCRIPT_DELIMITER) {
        return Err(Error::Config {
            message: format!(
                "identifier in '{}' contains the substitution delimiter '{}'",
                entry, SCRIPT_DELIMITER
            ),
            hint: Some("Remove 'substitute_script' to use the built-in substitution".to_string()),
        });
    }
    Ok(())
}
