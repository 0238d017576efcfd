//! # Output Configuration
//!
//! Controls how command summaries look: colors and emoji are used only when
//! the terminal and the user allow them.
//!
//! The following flags and environment variables are honoured:
//! - `--color=never|always|auto`
//! - `NO_COLOR` - disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - disables colors
//! - `CLICOLOR_FORCE=1` - forces colors even when stdout is not a TTY
//! - `TERM=dumb` - disables colors
//!
//! Logging goes through `log`; this module only shapes the human summary
//! printed to stdout at the end of a command.

use std::env;
use std::fmt::Write as _;

use console::style;

use crate::phases::RunReport;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `always` and `never` win over the environment; anything else
    /// auto-detects.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // Presence alone disables colors, even when empty.
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns `emoji_str` when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Renders the end-of-run summary of a migration.
pub fn format_run_report(config: &OutputConfig, report: &RunReport, dry_run: bool) -> String {
    let mut out = String::new();
    let (squash_label, push_label) = if dry_run {
        ("Branches to squash", "Branches to push")
    } else {
        ("Branches squashed", "Branches pushed")
    };

    let heading = if dry_run {
        "Migration summary (dry run)"
    } else {
        "Migration summary"
    };
    let heading = if config.use_color {
        style(heading).bold().to_string()
    } else {
        heading.to_string()
    };
    let _ = writeln!(out, "\n{} {}", emoji(config, "📊", "[INFO]"), heading);
    let _ = writeln!(out, "   Mirrors synced: {}", report.synced.len());
    let _ = writeln!(out, "   {}: {}", squash_label, report.squashed.len());
    for (repo, branch) in &report.squashed {
        let _ = writeln!(out, "     {} {}", repo, branch);
    }
    if let Some(outcome) = report.rewrite {
        let _ = writeln!(out, "   Anchor rewrite: {:?}", outcome);
    }
    let _ = writeln!(out, "   {}: {}", push_label, report.pushed.len());
    for (repo, branch) in &report.pushed {
        let _ = writeln!(out, "     {} {}", repo, branch);
    }

    if let Some(error) = &report.aborted {
        let line = format!("Run aborted: {}", error);
        let line = if config.use_color {
            style(line).red().to_string()
        } else {
            line
        };
        let _ = writeln!(out, "{} {}", emoji(config, "❌", "[ERR]"), line);
    }
    if report.failures.is_empty() {
        if report.aborted.is_none() {
            let _ = writeln!(out, "{} No failures", emoji(config, "✅", "[OK]"));
        }
    } else {
        let _ = writeln!(
            out,
            "{} {} failure(s):",
            emoji(config, "❌", "[ERR]"),
            report.failures.len()
        );
        for failure in &report.failures {
            let line = format!("{} [{}]: {}", failure.repo, failure.stage, failure.error);
            let line = if config.use_color {
                style(line).red().to_string()
            } else {
                line
            };
            let _ = writeln!(out, "   {}", line);
        }
    }
    out
}
