//! Visualize command implementation.
//!
//! The visualize command:
//! 1. Resolves the log layout of a run directory
//! 2. Decodes, analyzes and embeds the logs into one HTML file

use crate::artifact::{ArtifactSources, ArtifactSummary};
use crate::collect::LoggingPaths;
use crate::pipeline::{visualize, VisualizeOptions};
use crate::utils::config::default_assets_dir;
use anyhow::{Context, Result};
use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Arguments for the visualize command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct VisualizeArgs {
    /// Log directory written by collect
    pub data_dir: PathBuf,

    /// Output HTML file (defaults to `<data_dir>.html`)
    pub output: Option<PathBuf>,

    /// Asset directory holding the visualizer
    pub assets_dir: PathBuf,
}

impl Default for VisualizeArgs {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            output: None,
            assets_dir: default_assets_dir(),
        }
    }
}

impl VisualizeArgs {
    /// Output path, falling back to the data directory with `.html` appended
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output(&self.data_dir))
    }
}

/// `1234.async-trace/` becomes `1234.async-trace.html` next to it
pub fn default_output(data_dir: &Path) -> PathBuf {
    match data_dir.file_name() {
        Some(dirname) => {
            let mut name = OsString::from(dirname);
            name.push(".html");
            data_dir.with_file_name(name)
        }
        None => data_dir.join("async-trace.html"),
    }
}

/// Execute the visualize command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// Summary of the written artifact
///
/// # Errors
/// * The directory is not a log directory
/// * A log is missing, truncated or malformed
/// * The artifact could not be written
pub fn execute_visualize(args: &VisualizeArgs) -> Result<ArtifactSummary> {
    let start_time = Instant::now();
    let output = args.output_path();

    info!("Visualizing: {}", args.data_dir.display());

    // Step 1: Resolve layout
    info!("Step 1/2: Resolving log layout...");
    let paths = LoggingPaths::from_directory(&args.data_dir)
        .context("Failed to resolve log directory")?;

    debug!("System info: {}", paths.system_info.display());
    debug!("Stack traces: {}", paths.stack_trace.display());
    debug!("Trace events: {}", paths.trace_event.display());

    // Step 2: Decode, analyze, assemble
    info!("Step 2/2: Decoding logs and writing artifact...");
    let options = VisualizeOptions {
        sources: ArtifactSources::from_assets_dir(&args.assets_dir),
    };
    let summary = visualize(&paths.root, &output, &options)
        .with_context(|| format!("Failed to visualize {}", args.data_dir.display()))?;

    info!("✓ Artifact written to: {}", summary.output.display());

    let elapsed = start_time.elapsed();
    info!("Visualize completed in {:.2}s", elapsed.as_secs_f64());

    Ok(summary)
}

/// Validate visualize arguments
///
/// **Public** - can be called before execute_visualize for early validation
pub fn validate_visualize_args(args: &VisualizeArgs) -> Result<()> {
    if args.data_dir.as_os_str().is_empty() {
        anyhow::bail!("Data directory cannot be empty");
    }

    if !args.data_dir.is_dir() {
        anyhow::bail!("Data directory not found: {}", args.data_dir.display());
    }

    let sources = ArtifactSources::from_assets_dir(&args.assets_dir);
    if !sources.script_entry.is_file() {
        anyhow::bail!(
            "Visualizer not found: {} (set --assets or ASYNC_TRACE_ASSETS)",
            sources.script_entry.display()
        );
    }

    Ok(())
}
