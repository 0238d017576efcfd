//! # Error Handling
//!
//! This module defines the centralized error type for the `repo-migrate`
//! library. It uses `thiserror` to build a single `Error` enum whose variants
//! line up with the stages of a migration run, so every failure carries the
//! repository, branch, and stage it happened in.
//!
//! ## Key Components
//!
//! - **`Error`**: every failure mode of a migration run. The stage variants
//!   (`MirrorSync`, `Squash`, `Rewrite`, `Publish`) are what the orchestrator
//!   records in its run report; the lower-level variants (`GitCommand`,
//!   `Tool`, `Hosting`) are produced by the collaborators and wrapped into a
//!   stage variant at the stage boundary.
//!
//! - **`Result<T>`**: a type alias for `std::result::Result<T, Error>`.
//!
//! `Config` errors are raised before any filesystem or network mutation and
//! map to their own exit code in the binary.

use thiserror::Error;

/// Main error type for repo-migrate operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing configuration, repository table, or pipeline
    /// definition.
    ///
    /// Always raised before any mutation takes place.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The local mirror of a repository could not be brought up to date.
    #[error("Mirror sync failed for {repo}: {message}")]
    MirrorSync { repo: String, message: String },

    /// The external squash executable failed for a repository branch.
    #[error("Squash failed for {repo}@{branch}: {message}")]
    Squash {
        repo: String,
        branch: String,
        message: String,
    },

    /// A step of the anchor repository rewrite failed.
    #[error("Rewrite of {repo} failed at step '{step}': {message}")]
    Rewrite {
        repo: String,
        step: String,
        message: String,
    },

    /// Adding the destination remote or pushing a branch failed.
    #[error("Publish failed for {repo}{}: {message}", branch.as_ref().map(|b| format!("@{}", b)).unwrap_or_default())]
    Publish {
        repo: String,
        /// The branch being pushed, if the failure happened during a push
        branch: Option<String>,
        message: String,
    },

    /// A git subprocess exited unsuccessfully.
    #[error("Git command failed in {dir}: {command} - {stderr}")]
    GitCommand {
        command: String,
        dir: String,
        stderr: String,
    },

    /// An external executable (squash or substitution script) failed.
    #[error("External tool {program} failed in {dir}: {message}")]
    Tool {
        program: String,
        dir: String,
        message: String,
    },

    /// A hosting-provider API call failed.
    #[error("Hosting provider error during {operation}: {message}")]
    Hosting { operation: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A CSV parsing error, wrapped from `csv::Error`.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Shorthand for a `Config` error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            hint: None,
        }
    }

    /// Whether this error was raised while validating configuration inputs.
    ///
    /// YAML and CSV decoding failures count: both only happen while loading
    /// inputs, before anything is mutated.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. } | Error::Yaml(_) | Error::Csv(_))
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
