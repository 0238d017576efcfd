//! Process exit codes of the `repo-migrate` binary.

/// Every stage succeeded.
pub const SUCCESS: u8 = 0;

/// A repository failed a stage, or the anchor rewrite failed.
pub const FAILURE: u8 = 1;

/// Invalid command-line usage. Reported by clap.
pub const USAGE: u8 = 2;

/// The configuration, repository table or pipeline definition is invalid.
/// Nothing was mutated.
pub const CONFIG: u8 = 3;

/// Maps a command error to an exit code.
pub fn for_error(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<crate::error::Error>() {
        Some(e) if e.is_config() => CONFIG,
        _ => FAILURE,
    }
}
