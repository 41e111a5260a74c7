//! Paths command implementation.
//!
//! Prints where each log of a run lives, given either a run identifier or
//! an existing log directory.

use crate::collect::{LogKind, LoggingPaths, RunIdentifier};
use crate::utils::config::LOG_DIR_SUFFIX;
use anyhow::{Context, Result};
use std::path::Path;

/// Resolve the layout for `target`
///
/// **Public** - a target ending in `.async-trace` is read as a log
/// directory, anything else as a run identifier under `base_dir`
pub fn resolve_paths(target: &str, base_dir: &Path) -> Result<LoggingPaths> {
    let trimmed = target.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        anyhow::bail!("Run identifier cannot be empty");
    }

    if trimmed.ends_with(LOG_DIR_SUFFIX) {
        LoggingPaths::from_directory(trimmed)
            .with_context(|| format!("Failed to resolve {}", target))
    } else {
        Ok(LoggingPaths::for_run(base_dir, &RunIdentifier::new(trimmed)))
    }
}

/// Print the layout of a run
///
/// **Public** - main entry point called from main.rs
pub fn execute_paths(target: &str, base_dir: &Path) -> Result<()> {
    let paths = resolve_paths(target, base_dir)?;

    println!("Run: {}", paths.identifier);
    println!("  {:<11} {}", LogKind::Root.name(), paths.root.display());
    for kind in LogKind::FILES {
        let path = paths.get(kind);
        let marker = if path.is_file() { "✓" } else { " " };
        println!("{} {:<11} {}", marker, kind.name(), path.display());
    }

    Ok(())
}
