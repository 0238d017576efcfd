//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new().with_minimal_inputs();
//! fixture.command().arg("validate").assert().success();
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::inputs;
    pub use super::TestFixture;
}

/// Input file snippets.
#[allow(dead_code)]
pub mod inputs {
    /// Configuration pointing at the sibling `repos.csv` and
    /// `pipelines.yaml`, with mirrors under `mirrors/`.
    pub const CONFIG: &str = r#"
gitdir: mirrors
old_hostname: gerrit.example.com
new_hostname: github.com
repos_csv_file_path: repos.csv
pipelines_file_path: pipelines.yaml
anchor_repo: OldOrg/project-config
skip_branches:
  OldOrg/proj1: [stable/2018]
"#;

    pub const REPOS: &str = "\
Old org,Old name,New org,New name,Hosted
,,,,
OldOrg,proj1,NewOrg,proj1-new,no
OldOrg,proj2,NewOrg,proj2,no
OldOrg,tools,NewOrg,tools,yes
";

    /// A data row with four fields.
    pub const REPOS_SHORT_ROW: &str = "\
Old org,Old name,New org,New name,Hosted
,,,,
OldOrg,proj1,NewOrg,proj1-new
";

    pub const PIPELINES: &str = r#"
- pipeline:
    name: check
    trigger:
      gerrit:
        - event: patchset-created
          branch:
            - ^master$
            - ^stable/2019$
- pipeline:
    name: gate
    trigger:
      gerrit:
        - event: comment-added
          branch: [^master$]
- pipeline:
    name: post
    trigger:
      gerrit:
        - branch: [^R5.0$]
"#;

    pub const INVALID_YAML: &str = "old_hostname: [unclosed";
}

/// A temporary directory holding the inputs of a run.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Writes `config.yaml`.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file("config.yaml", content)
    }

    /// Writes a valid `config.yaml`, `repos.csv` and `pipelines.yaml`.
    pub fn with_minimal_inputs(self) -> Self {
        self.with_config(inputs::CONFIG)
            .with_file("repos.csv", inputs::REPOS)
            .with_file("pipelines.yaml", inputs::PIPELINES)
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("config.yaml")
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// The `repo-migrate` binary, run inside the fixture directory with
    /// logging reduced to errors.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("repo-migrate");
        cmd.current_dir(self.path())
            .env_remove("REPO_MIGRATE_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--color")
            .arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
