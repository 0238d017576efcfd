//! Default values for repo-migrate configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Returns the default mirror root directory.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/repo-migrate` (XDG Base Directory)
/// - macOS: `~/Library/Caches/repo-migrate`
/// - Windows: `{FOLDERID_LocalAppData}\repo-migrate`
///
/// Falls back to `.repo-migrate-mirrors` in the current directory if the
/// platform cache directory cannot be determined.
pub fn default_gitdir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("repo-migrate"))
        .unwrap_or_else(|| PathBuf::from(".repo-migrate-mirrors").join("repo-migrate"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gitdir_returns_path() {
        let gitdir = default_gitdir();
        assert!(gitdir.ends_with("repo-migrate"));
    }

    #[test]
    fn test_default_gitdir_is_absolute_or_fallback() {
        let gitdir = default_gitdir();
        assert!(
            gitdir.is_absolute() || gitdir.starts_with(".repo-migrate-mirrors"),
            "Expected absolute path or fallback, got: {:?}",
            gitdir
        );
    }
}
