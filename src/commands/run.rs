//! Run command implementation.
//!
//! Collects a program's logs, then immediately visualizes them into
//! `<log_dir>.html` (or the requested output).

use super::collect::{execute_collect, CollectArgs};
use super::visualize::{execute_visualize, VisualizeArgs};
use crate::artifact::ArtifactSummary;
use anyhow::Result;
use log::info;
use std::path::PathBuf;

/// Arguments for the run command
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub collect: CollectArgs,

    /// Output HTML file (defaults to `<log_dir>.html`)
    pub output: Option<PathBuf>,
}

/// Execute the run command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// Whatever collect or visualize fail with; an interrupted program still
/// gets visualized.
pub fn execute_run(args: &RunArgs) -> Result<ArtifactSummary> {
    info!("Step 1/2: Collecting...");
    let collection = execute_collect(&args.collect)?;

    info!("Step 2/2: Visualizing {}...", collection.log_dir.display());
    let visualize_args = VisualizeArgs {
        data_dir: collection.log_dir,
        output: args.output.clone(),
        assets_dir: args.collect.assets_dir.clone(),
    };
    execute_visualize(&visualize_args)
}
