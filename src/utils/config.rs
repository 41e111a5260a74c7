//! Configuration and constants for collection and visualization.

use std::path::PathBuf;

/// Suffix shared by the log directory and every log file of a run.
///
/// A run with identifier `1234` writes to `1234.async-trace/`, containing
/// `1234.async-trace-systeminfo` and friends.
pub const LOG_DIR_SUFFIX: &str = ".async-trace";

pub const SYSTEM_INFO_SUFFIX: &str = "-systeminfo";
pub const STACK_TRACE_SUFFIX: &str = "-stacktrace";
pub const TRACE_EVENT_SUFFIX: &str = "-traceevent";

/// File Node's `--trace-events-enabled` writes into the working directory.
pub const TRACE_EVENT_SOURCE: &str = "node_trace.1.log";

/// Environment variable carrying extra runtime options to the child.
pub const NODE_OPTIONS_VAR: &str = "NODE_OPTIONS";

/// Environment variable telling the hook where to create the run directory.
pub const LOG_BASE_ENV_VAR: &str = "ASYNC_TRACE_BASE_DIR";

/// Trace event categories enabled in the child.
pub const TRACE_EVENT_CATEGORIES: &str = "node.async_hooks";

/// STATUS_CONTROL_C_EXIT (0xC000013A), reported by Windows when a process
/// dies from an uncaught Ctrl+C.
pub const WINDOWS_INTERRUPT_EXIT_CODE: i64 = 3_221_225_786;

pub const INTERRUPT_SIGNAL_NAME: &str = "SIGINT";

// Record stream framing inside the data module
pub const RECORD_OPEN: &str = "[\n";
pub const RECORD_SEPARATOR: &str = ",\n";
pub const RECORD_CLOSE: &str = "\n]\n";

/// Bound on in-flight decoded records per decoder thread
pub const DECODER_CHANNEL_CAPACITY: usize = 1024;

/// Environment variable overriding the asset directory
pub const ASSETS_ENV_VAR: &str = "ASYNC_TRACE_ASSETS";

pub const ARTIFACT_TITLE: &str = "Async Trace Studio";

/// Asset directory shipped with the crate.
///
/// `ASYNC_TRACE_ASSETS` takes precedence so installed binaries can point at
/// a copied asset tree.
pub fn default_assets_dir() -> PathBuf {
    std::env::var_os(ASSETS_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets"))
}
