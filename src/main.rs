//! Async Trace Studio CLI
//!
//! Traces the asynchronous activity of a Node.js program and renders it
//! as a self-contained HTML page.

use anyhow::Result;
use async_trace_studio::commands::{
    execute_collect, execute_paths, execute_run, execute_visualize, validate_collect_args,
    validate_visualize_args, CollectArgs, RunArgs, VisualizeArgs,
};
use async_trace_studio::utils::config::{default_assets_dir, ASSETS_ENV_VAR};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

/// Async Trace Studio - async activity profiling for Node.js
#[derive(Parser, Debug)]
#[command(name = "async-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options shared by commands that run a program
#[derive(Args, Debug)]
struct TargetOptions {
    /// Directory the run directory is created in
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Asset directory (hook and visualizer)
    #[arg(long, env = ASSETS_ENV_VAR)]
    assets: Option<PathBuf>,

    /// Program to trace, followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    command: Vec<String>,
}

impl TargetOptions {
    fn into_collect_args(self) -> CollectArgs {
        CollectArgs {
            command: self.command,
            base_dir: self.base_dir,
            assets_dir: self.assets.unwrap_or_else(default_assets_dir),
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a program and collect its async activity logs
    Collect {
        #[command(flatten)]
        target: TargetOptions,
    },

    /// Render a log directory as an HTML page
    Visualize {
        /// Log directory written by collect
        data_dir: PathBuf,

        /// Output HTML file (defaults to <data_dir>.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Asset directory (visualizer)
        #[arg(long, env = ASSETS_ENV_VAR)]
        assets: Option<PathBuf>,
    },

    /// Collect, then visualize
    Run {
        /// Output HTML file (defaults to <log_dir>.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        target: TargetOptions,
    },

    /// Show the log layout of a run identifier or directory
    Paths {
        /// Run identifier or log directory
        target: String,

        /// Directory run identifiers are resolved under
        #[arg(long, default_value = ".")]
        base_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Collect { target } => {
            let args = target.into_collect_args();
            validate_collect_args(&args)?;

            let collection = execute_collect(&args)?;
            println!("{}", collection.log_dir.display());
        }

        Commands::Visualize {
            data_dir,
            output,
            assets,
        } => {
            let args = VisualizeArgs {
                data_dir,
                output,
                assets_dir: assets.unwrap_or_else(default_assets_dir),
            };
            validate_visualize_args(&args)?;

            let summary = execute_visualize(&args)?;
            println!("{}", summary.output.display());
        }

        Commands::Run { output, target } => {
            let args = RunArgs {
                collect: target.into_collect_args(),
                output,
            };
            validate_collect_args(&args.collect)?;

            let summary = execute_run(&args)?;
            println!("{}", summary.output.display());
        }

        Commands::Paths { target, base_dir } => {
            execute_paths(&target, &base_dir)?;
        }
    }

    Ok(())
}
