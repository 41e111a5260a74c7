//! Collect command implementation.
//!
//! The collect command:
//! 1. Runs the target program with the instrumentation hook preloaded
//! 2. Forwards Ctrl+C to it while it runs
//! 3. Moves the runtime's trace log into the run directory

use crate::collect::{collect, CollectOptions, Collection, InterruptRelay, Termination};
use crate::utils::config::{default_assets_dir, TRACE_EVENT_SOURCE};
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the collect command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct CollectArgs {
    /// Program to trace followed by its arguments
    pub command: Vec<String>,

    /// Directory the run directory is created in
    pub base_dir: PathBuf,

    /// Asset directory holding `hook/sampler.js`
    pub assets_dir: PathBuf,
}

impl Default for CollectArgs {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            base_dir: PathBuf::from("."),
            assets_dir: default_assets_dir(),
        }
    }
}

impl CollectArgs {
    /// Library options derived from the CLI arguments
    pub fn options(&self) -> CollectOptions {
        CollectOptions {
            hook_path: self.assets_dir.join("hook").join("sampler.js"),
            base_dir: self.base_dir.clone(),
            trace_event_source: PathBuf::from(TRACE_EVENT_SOURCE),
        }
    }
}

/// Execute the collect command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The run's log directory and how the program ended
///
/// # Errors
/// * The program could not be launched
/// * The program failed (non-zero exit or a signal other than SIGINT)
/// * The trace log could not be moved
pub fn execute_collect(args: &CollectArgs) -> Result<Collection> {
    let start_time = Instant::now();
    let options = args.options();

    info!("Collecting: {}", args.command.join(" "));

    let collection = collect(&args.command, &options, InterruptRelay::global())
        .map_err(|e| {
            if let Some(log_dir) = e.log_dir() {
                warn!("Partial logs may remain in {}", log_dir.display());
            }
            e
        })
        .context("Failed to collect logs")?;

    if collection.termination == Termination::Interrupted {
        info!("Program was interrupted; logs up to the interrupt were kept");
    }

    let elapsed = start_time.elapsed();
    info!("Collect completed in {:.2}s", elapsed.as_secs_f64());

    Ok(collection)
}

/// Validate collect arguments
///
/// **Public** - can be called before execute_collect for early validation
pub fn validate_collect_args(args: &CollectArgs) -> Result<()> {
    match args.command.first() {
        None => anyhow::bail!("No command specified to run"),
        Some(program) if program.trim().is_empty() => {
            anyhow::bail!("Program name cannot be empty")
        }
        Some(_) => {}
    }

    let hook = args.options().hook_path;
    if !hook.is_file() {
        anyhow::bail!(
            "Instrumentation hook not found: {} (set --assets or ASYNC_TRACE_ASSETS)",
            hook.display()
        );
    }

    if args.base_dir.exists() && !args.base_dir.is_dir() {
        anyhow::bail!("Base directory is not a directory: {}", args.base_dir.display());
    }

    Ok(())
}
