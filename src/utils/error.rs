//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while resolving a log directory layout
#[derive(Error, Debug)]
pub enum PathsError {
    #[error("Not a log directory: {0} (expected a directory named <id>.async-trace)")]
    UnrecognizedDirectory(PathBuf),

    #[error("Cannot create log directory {path}: {source}")]
    CreateRoot { path: PathBuf, source: io::Error },
}

/// A termination that is neither a clean exit nor an interrupt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerminationError {
    #[error("process exited with exit code {0}")]
    ExitCode(i64),

    #[error("process exited by signal {0}")]
    Signal(String),

    #[error("process exited without an exit code or a signal")]
    Unknown,
}

/// Errors that can occur while collecting logs from a target program
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("No command specified to run")]
    EmptyCommand,

    #[error("Failed to launch {program}: {source}")]
    Launch { program: String, source: io::Error },

    #[error("Failed to wait for process {pid}: {source}")]
    Wait {
        log_dir: PathBuf,
        pid: u32,
        source: io::Error,
    },

    #[error("{source}")]
    Termination {
        log_dir: PathBuf,
        source: TerminationError,
    },

    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    Relocation {
        log_dir: PathBuf,
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

impl CollectError {
    /// Log directory of the run, when the target got far enough to have one.
    ///
    /// Lets the caller inspect whatever the run left behind.
    pub fn log_dir(&self) -> Option<&Path> {
        match self {
            CollectError::EmptyCommand | CollectError::Launch { .. } => None,
            CollectError::Wait { log_dir, .. }
            | CollectError::Termination { log_dir, .. }
            | CollectError::Relocation { log_dir, .. } => Some(log_dir),
        }
    }
}

/// Errors that can occur while decoding a telemetry log
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Cannot open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("Read failed: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed record at {location}: {source}")]
    Json {
        location: String,
        source: serde_json::Error,
    },

    #[error("Truncated log: {0}")]
    Truncated(String),

    #[error("Invalid log format: {0}")]
    Format(String),
}

/// Errors surfaced by an analysis engine
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to decode {}: {source}", .path.display())]
    Decode { path: PathBuf, source: DecodeError },

    #[error("System info log contained no record")]
    MissingSystemInfo,
}

/// Errors that can occur while assembling the HTML artifact
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Failed to serialize analysis record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to read {}: {source}", .path.display())]
    ReadAsset { path: PathBuf, source: io::Error },

    #[error("Cannot resolve require('{specifier}') from {}", .from.display())]
    UnresolvedModule { specifier: String, from: PathBuf },

    #[error("{} never requires the data module {}", .entry.display(), .data.display())]
    MissingDataModule { entry: PathBuf, data: PathBuf },

    #[error("Failed to write artifact: {0}")]
    Write(#[from] io::Error),

    #[error("Failed to persist artifact to {}: {source}", .path.display())]
    Persist { path: PathBuf, source: io::Error },

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors that can occur during the visualize phase
#[derive(Error, Debug)]
pub enum VisualizeError {
    #[error(transparent)]
    Paths(#[from] PathsError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}
