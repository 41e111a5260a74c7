//! Canonical on-disk layout of a collection run.
//!
//! Every run owns one directory named after its identifier:
//!
//! ```text
//! 1234.async-trace/
//!   1234.async-trace-systeminfo
//!   1234.async-trace-stacktrace
//!   1234.async-trace-traceevent
//! ```

use crate::utils::config::{
    LOG_DIR_SUFFIX, STACK_TRACE_SUFFIX, SYSTEM_INFO_SUFFIX, TRACE_EVENT_SUFFIX,
};
use crate::utils::error::PathsError;
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};

/// Token naming one collection run (the child's pid in practice)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunIdentifier(String);

impl RunIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_pid(pid: u32) -> Self {
        Self(pid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical log kinds stored in a run directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Root,
    SystemInfo,
    StackTrace,
    TraceEvent,
}

impl LogKind {
    pub const FILES: [LogKind; 3] = [LogKind::SystemInfo, LogKind::StackTrace, LogKind::TraceEvent];

    pub fn name(self) -> &'static str {
        match self {
            LogKind::Root => "root",
            LogKind::SystemInfo => "systeminfo",
            LogKind::StackTrace => "stacktrace",
            LogKind::TraceEvent => "traceevent",
        }
    }
}

/// Absolute paths of every log file of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingPaths {
    pub identifier: RunIdentifier,
    pub root: PathBuf,
    pub system_info: PathBuf,
    pub stack_trace: PathBuf,
    pub trace_event: PathBuf,
}

impl LoggingPaths {
    /// Layout for a run, rooted under `base_dir`
    ///
    /// **Public** - pure function of its inputs; calling it twice with the
    /// same identifier yields identical paths.
    pub fn for_run(base_dir: impl AsRef<Path>, identifier: &RunIdentifier) -> Self {
        let dirname = format!("{}{}", identifier, LOG_DIR_SUFFIX);
        let root = absolute(base_dir.as_ref()).join(&dirname);
        Self::with_root(identifier.clone(), root, &dirname)
    }

    /// Layout of an existing log directory
    ///
    /// **Public** - used by the visualize phase
    ///
    /// # Errors
    /// * `PathsError::UnrecognizedDirectory` - the directory name does not
    ///   follow the `<id>.async-trace` convention
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, PathsError> {
        let dir = dir.as_ref();
        let dirname = dir
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PathsError::UnrecognizedDirectory(dir.to_path_buf()))?;

        let identifier = dirname
            .strip_suffix(LOG_DIR_SUFFIX)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PathsError::UnrecognizedDirectory(dir.to_path_buf()))?;

        debug!("Resolved run identifier {} from {}", identifier, dir.display());

        Ok(Self::with_root(
            RunIdentifier::new(identifier),
            absolute(dir),
            dirname,
        ))
    }

    fn with_root(identifier: RunIdentifier, root: PathBuf, dirname: &str) -> Self {
        Self {
            system_info: root.join(format!("{}{}", dirname, SYSTEM_INFO_SUFFIX)),
            stack_trace: root.join(format!("{}{}", dirname, STACK_TRACE_SUFFIX)),
            trace_event: root.join(format!("{}{}", dirname, TRACE_EVENT_SUFFIX)),
            identifier,
            root,
        }
    }

    pub fn get(&self, kind: LogKind) -> &Path {
        match kind {
            LogKind::Root => &self.root,
            LogKind::SystemInfo => &self.system_info,
            LogKind::StackTrace => &self.stack_trace,
            LogKind::TraceEvent => &self.trace_event,
        }
    }

    /// Create the run directory if it does not exist yet
    pub fn ensure_root(&self) -> Result<(), PathsError> {
        if !self.root.is_dir() {
            debug!("Creating log directory: {}", self.root.display());
            std::fs::create_dir_all(&self.root).map_err(|source| PathsError::CreateRoot {
                path: self.root.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Anchor a path at the working directory without touching the filesystem.
///
/// Only an empty path or an unreadable working directory fail; the path is
/// kept as given then.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_for_run_is_pure() {
        let id = RunIdentifier::from_pid(4242);
        assert_eq!(
            LoggingPaths::for_run("/tmp", &id),
            LoggingPaths::for_run("/tmp", &id)
        );
    }

    #[test]
    fn test_for_run_layout() {
        let paths = LoggingPaths::for_run("/base", &RunIdentifier::from_pid(7));

        assert_eq!(paths.root, PathBuf::from("/base/7.async-trace"));
        assert_eq!(
            paths.system_info,
            PathBuf::from("/base/7.async-trace/7.async-trace-systeminfo")
        );
        assert_eq!(
            paths.stack_trace,
            PathBuf::from("/base/7.async-trace/7.async-trace-stacktrace")
        );
        assert_eq!(
            paths.trace_event,
            PathBuf::from("/base/7.async-trace/7.async-trace-traceevent")
        );
    }

    #[test]
    fn test_all_files_share_root() {
        let paths = LoggingPaths::for_run(".", &RunIdentifier::from_pid(1));
        for kind in LogKind::FILES {
            assert_eq!(paths.get(kind).parent(), Some(paths.root.as_path()));
        }
    }

    #[test]
    fn test_relative_base_is_made_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let paths = LoggingPaths::for_run(".", &RunIdentifier::from_pid(3));

        assert!(paths.root.is_absolute());
        assert_eq!(paths.root, cwd.join("3.async-trace"));
        assert_eq!(
            LoggingPaths::from_directory("3.async-trace").unwrap(),
            paths
        );
    }

    #[test]
    fn test_from_directory_matches_for_run() {
        let id = RunIdentifier::from_pid(99);
        let collected = LoggingPaths::for_run("/data", &id);
        let reopened = LoggingPaths::from_directory("/data/99.async-trace").unwrap();

        assert_eq!(reopened, collected);
    }

    #[test]
    fn test_from_directory_trailing_slash() {
        let paths = LoggingPaths::from_directory("/data/99.async-trace/").unwrap();
        assert_eq!(paths.identifier.as_str(), "99");
    }

    #[test]
    fn test_from_directory_rejects_foreign_names() {
        assert!(LoggingPaths::from_directory("/data/profile").is_err());
        assert!(LoggingPaths::from_directory("/data/.async-trace").is_err());
    }

    #[test]
    fn test_ensure_root_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let paths = LoggingPaths::for_run(temp_dir.path().join("nested"), &RunIdentifier::new("x"));

        paths.ensure_root().unwrap();

        assert!(paths.root.is_dir());
    }
}
