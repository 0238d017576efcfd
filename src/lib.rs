//! # Repository Fleet Migration Library
//!
//! This library moves a fleet of repositories from one hosting and
//! organization scheme to another. It is designed to be used by the
//! `repo-migrate` command-line tool, but every stage can be driven directly
//! with injected collaborators.
//!
//! ## Quick Example
//!
//! ```
//! use repo_migrate::rename::{RenameEntry, RenameTable};
//!
//! let table = RenameTable::new(vec![
//!     RenameEntry::new("OldOrg/proj1", "NewOrg/proj1-new"),
//!     RenameEntry::new("gerrit.example.com/OldOrg/proj1", "github.com/NewOrg/proj1-new"),
//! ]);
//!
//! assert_eq!(
//!     table.rewrite("clone gerrit.example.com/OldOrg/proj1 now"),
//!     "clone github.com/NewOrg/proj1-new now"
//! );
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: The `config.yaml` document, parsed once
//!   into an immutable value passed to every stage.
//! - **Registry (`registry`, `repository`)**: The repository table and the
//!   immutable identity of each repository, including its mirror path.
//! - **Branches (`branches`)**: The in-scope branch set, read from the
//!   pipeline/trigger definition.
//! - **Rename Table (`rename`)**: Old to new identifiers, longest first.
//! - **Collaborators (`git`, `tools`, `substitute`, `hosting`)**: Traits at
//!   every process or network boundary, with subprocess and HTTP
//!   implementations.
//! - **Phases (`phases`)**: The stages of a run and the orchestrator that
//!   sequences them.
//!
//! ## Execution Flow
//!
//! `phases::orchestrator::execute` runs:
//!
//! 1.  **Mirror Sync**: Clone or update a local mirror of every repository.
//! 2.  **History Squash**: Run the squash script on every eligible branch.
//! 3.  **Reference Rewrite**: Patch the anchor repository, rewrite every old
//!     identifier in it and commit.
//! 4.  **Publish**: Add the destination remote and push every eligible branch.
//!
//! Each stage can be re-run; resuming a failed run means running it again.

pub mod branches;
pub mod config;
pub mod defaults;
pub mod error;
pub mod exit_codes;
pub mod git;
pub mod hosting;
pub mod output;
pub mod phases;
pub mod preview;
pub mod registry;
pub mod rename;
pub mod repository;
pub mod substitute;
pub mod tools;
