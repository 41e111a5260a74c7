//! Launching and supervising the traced program.

use super::interrupt::InterruptRelay;
use super::paths::{LoggingPaths, RunIdentifier};
use super::relocate::relocate_file;
use crate::utils::config::{
    INTERRUPT_SIGNAL_NAME, LOG_BASE_ENV_VAR, NODE_OPTIONS_VAR, TRACE_EVENT_CATEGORIES,
    TRACE_EVENT_SOURCE, WINDOWS_INTERRUPT_EXIT_CODE,
};
use crate::utils::error::{CollectError, TerminationError};
use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Options for the collect phase
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Instrumentation hook preloaded with `-r`
    pub hook_path: PathBuf,

    /// Directory the run directory is created in
    pub base_dir: PathBuf,

    /// Raw trace log written by the runtime's tracing facility
    pub trace_event_source: PathBuf,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            hook_path: crate::utils::config::default_assets_dir()
                .join("hook")
                .join("sampler.js"),
            base_dir: PathBuf::from("."),
            trace_event_source: PathBuf::from(TRACE_EVENT_SOURCE),
        }
    }
}

/// Raw termination report of a child process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessResult {
    pub code: Option<i64>,
    pub signal: Option<String>,
}

impl ProcessResult {
    pub fn exited(code: i64) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signaled(signal: impl Into<String>) -> Self {
        Self {
            code: None,
            signal: Some(signal.into()),
        }
    }

    pub fn from_status(status: &ExitStatus) -> Self {
        Self {
            code: status.code().map(i64::from),
            signal: status_signal(status),
        }
    }
}

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exit code 0
    Exited,
    /// Stopped by the forwarded interrupt
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Other
        }
    }
}

/// Result of a successful collect
#[derive(Debug, Clone)]
pub struct Collection {
    pub identifier: RunIdentifier,
    pub log_dir: PathBuf,
    pub termination: Termination,
}

/// Classify a child's termination
///
/// **Public** - pure, so it can be exercised without spawning processes
///
/// # Returns
/// * `Termination::Exited` for exit code 0
/// * `Termination::Interrupted` for SIGINT (or STATUS_CONTROL_C_EXIT on Windows)
///
/// # Errors
/// * `TerminationError::ExitCode` - any other exit code
/// * `TerminationError::Signal` - any other signal
pub fn classify(
    result: &ProcessResult,
    platform: Platform,
) -> Result<Termination, TerminationError> {
    let mut code = result.code;
    let mut signal = result.signal.as_deref();

    // Windows reports the code both unsigned and as a wrapped i32
    let is_interrupt_code =
        |c: i64| c == WINDOWS_INTERRUPT_EXIT_CODE || c as u32 as i64 == WINDOWS_INTERRUPT_EXIT_CODE;
    if platform == Platform::Windows && code.is_some_and(is_interrupt_code) {
        code = None;
        signal = Some(INTERRUPT_SIGNAL_NAME);
    }

    if code == Some(0) {
        return Ok(Termination::Exited);
    }
    if signal == Some(INTERRUPT_SIGNAL_NAME) {
        return Ok(Termination::Interrupted);
    }

    match (code, signal) {
        (Some(code), _) => Err(TerminationError::ExitCode(code)),
        (None, Some(signal)) => Err(TerminationError::Signal(signal.to_string())),
        (None, None) => Err(TerminationError::Unknown),
    }
}

/// Build the child's `NODE_OPTIONS`, keeping whatever the caller already set
pub fn node_options(hook_path: &Path, existing: Option<&OsString>) -> OsString {
    let hook = quote_option(&hook_path.to_string_lossy());

    let mut options = OsString::from(format!(
        "-r {} --trace-events-enabled --trace-event-categories {}",
        hook, TRACE_EVENT_CATEGORIES
    ));
    if let Some(existing) = existing.filter(|value| !value.is_empty()) {
        options.push(" ");
        options.push(existing);
    }
    options
}

/// Quote a `NODE_OPTIONS` value that would otherwise be split.
///
/// Inside quotes the runtime treats `\` as an escape character, so
/// backslashes and quotes are escaped there. Unquoted values are literal.
fn quote_option(value: &str) -> String {
    if !value.chars().any(|c| c.is_whitespace() || c == '"') {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '\\' || c == '"' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Run a program under instrumentation and collect its logs
///
/// **Public** - main entry point of the collect phase
///
/// # Arguments
/// * `command` - program followed by its arguments
/// * `options` - hook, base directory and trace source locations
/// * `relay` - interrupt relay the child is attached to while it runs
///
/// # Returns
/// The run's log directory and how the child ended
///
/// # Errors
/// * `CollectError::Launch` - the program could not be started
/// * `CollectError::Termination` - non-zero exit or non-interrupt signal
/// * `CollectError::Relocation` - the trace log could not be moved
pub fn collect(
    command: &[String],
    options: &CollectOptions,
    relay: &InterruptRelay,
) -> Result<Collection, CollectError> {
    let (program, args) = command.split_first().ok_or(CollectError::EmptyCommand)?;

    let node_options = node_options(
        &options.hook_path,
        std::env::var_os(NODE_OPTIONS_VAR).as_ref(),
    );
    debug!("{}={}", NODE_OPTIONS_VAR, node_options.to_string_lossy());

    let mut child = Command::new(program)
        .args(args)
        .env(NODE_OPTIONS_VAR, &node_options)
        .env(LOG_BASE_ENV_VAR, &options.base_dir)
        .spawn()
        .map_err(|source| CollectError::Launch {
            program: program.clone(),
            source,
        })?;

    let pid = child.id();
    let identifier = RunIdentifier::from_pid(pid);
    let paths = LoggingPaths::for_run(&options.base_dir, &identifier);
    info!("Tracing {} (pid {})", program, pid);

    let status = {
        let _guard = relay.attach(pid);
        child.wait()
    }
    .map_err(|source| CollectError::Wait {
        log_dir: paths.root.clone(),
        pid,
        source,
    })?;

    let result = ProcessResult::from_status(&status);
    debug!("Process {} ended: {:?}", pid, result);

    let termination = classify(&result, Platform::current()).map_err(|source| {
        CollectError::Termination {
            log_dir: paths.root.clone(),
            source,
        }
    })?;

    relocate_trace_log(&paths, &options.trace_event_source)?;

    info!("✓ Logs written to: {}", paths.root.display());

    Ok(Collection {
        identifier,
        log_dir: paths.root,
        termination,
    })
}

/// Move the runtime's trace log into the run directory
///
/// **Private** - internal helper for collect
fn relocate_trace_log(paths: &LoggingPaths, source: &Path) -> Result<(), CollectError> {
    let relocation_error = |e: std::io::Error| CollectError::Relocation {
        log_dir: paths.root.clone(),
        from: source.to_path_buf(),
        to: paths.trace_event.clone(),
        source: e,
    };

    paths
        .ensure_root()
        .map_err(|e| relocation_error(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    relocate_file(source, &paths.trace_event).map_err(relocation_error)
}

#[cfg(unix)]
fn status_signal(status: &ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(signal_name)
}

#[cfg(not(unix))]
fn status_signal(_status: &ExitStatus) -> Option<String> {
    None
}

/// Conventional name of a signal number
#[cfg(unix)]
pub fn signal_name(signal: i32) -> String {
    let name = match signal {
        libc::SIGHUP => "SIGHUP",
        libc::SIGINT => "SIGINT",
        libc::SIGQUIT => "SIGQUIT",
        libc::SIGILL => "SIGILL",
        libc::SIGTRAP => "SIGTRAP",
        libc::SIGABRT => "SIGABRT",
        libc::SIGBUS => "SIGBUS",
        libc::SIGFPE => "SIGFPE",
        libc::SIGKILL => "SIGKILL",
        libc::SIGUSR1 => "SIGUSR1",
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGUSR2 => "SIGUSR2",
        libc::SIGPIPE => "SIGPIPE",
        libc::SIGALRM => "SIGALRM",
        libc::SIGTERM => "SIGTERM",
        _ => return format!("signal {}", signal),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_clean_exit() {
        assert_eq!(
            classify(&ProcessResult::exited(0), Platform::Other),
            Ok(Termination::Exited)
        );
    }

    #[test]
    fn test_classify_nonzero_exit() {
        for code in [1, 2, 127, 255, -1] {
            let err = classify(&ProcessResult::exited(code), Platform::Other).unwrap_err();
            assert_eq!(err, TerminationError::ExitCode(code));
            assert!(err.to_string().contains(&code.to_string()));
        }
    }

    #[test]
    fn test_classify_sigint_is_success() {
        assert_eq!(
            classify(&ProcessResult::signaled("SIGINT"), Platform::Other),
            Ok(Termination::Interrupted)
        );
    }

    #[test]
    fn test_classify_other_signals_fail() {
        for signal in ["SIGTERM", "SIGKILL", "SIGSEGV"] {
            let err = classify(&ProcessResult::signaled(signal), Platform::Other).unwrap_err();
            assert_eq!(err.to_string(), format!("process exited by signal {}", signal));
        }
    }

    #[test]
    fn test_classify_windows_sentinel() {
        let result = ProcessResult::exited(WINDOWS_INTERRUPT_EXIT_CODE);
        assert_eq!(
            classify(&result, Platform::Windows),
            Ok(Termination::Interrupted)
        );

        // i32 view of the same code, as std reports it
        let wrapped = ProcessResult::exited(WINDOWS_INTERRUPT_EXIT_CODE as u32 as i32 as i64);
        assert_eq!(
            classify(&wrapped, Platform::Windows),
            Ok(Termination::Interrupted)
        );
    }

    #[test]
    fn test_classify_sentinel_elsewhere_is_error() {
        let result = ProcessResult::exited(WINDOWS_INTERRUPT_EXIT_CODE);
        assert_eq!(
            classify(&result, Platform::Other),
            Err(TerminationError::ExitCode(WINDOWS_INTERRUPT_EXIT_CODE))
        );
    }

    #[test]
    fn test_node_options_without_existing() {
        let options = node_options(Path::new("/opt/hook.js"), None);
        assert_eq!(
            options,
            OsString::from(
                "-r /opt/hook.js --trace-events-enabled --trace-event-categories node.async_hooks"
            )
        );
    }

    #[test]
    fn test_node_options_appends_existing() {
        let existing = OsString::from("--max-old-space-size=4096");
        let options = node_options(Path::new("/opt/hook.js"), Some(&existing));
        let options = options.to_string_lossy();

        assert!(options.starts_with("-r /opt/hook.js "));
        assert!(options.ends_with(" --max-old-space-size=4096"));
    }

    #[test]
    fn test_node_options_quotes_whitespace() {
        let options = node_options(Path::new("/opt/my hooks/hook.js"), None);
        assert!(options.to_string_lossy().starts_with("-r \"/opt/my hooks/hook.js\" "));
    }

    #[test]
    fn test_node_options_escapes_inside_quotes() {
        assert_eq!(
            quote_option(r"C:\Program Files\trace\hook.js"),
            r#""C:\\Program Files\\trace\\hook.js""#
        );
        assert_eq!(quote_option(r#"/opt/a"b.js"#), r#""/opt/a\"b.js""#);
        // no quoting, so backslashes stay literal
        assert_eq!(quote_option(r"C:\trace\hook.js"), r"C:\trace\hook.js");
    }

    #[test]
    fn test_collect_empty_command() {
        let err = collect(&[], &CollectOptions::default(), &InterruptRelay::new()).unwrap_err();
        assert!(matches!(err, CollectError::EmptyCommand));
        assert!(err.log_dir().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_name() {
        assert_eq!(signal_name(libc::SIGINT), "SIGINT");
        assert_eq!(signal_name(libc::SIGTERM), "SIGTERM");
    }
}
