#![cfg(unix)]

use async_trace_studio::artifact::ArtifactSources;
use async_trace_studio::collect::{
    collect, CollectOptions, InterruptRelay, LogKind, LoggingPaths, RunIdentifier, Termination,
};
use async_trace_studio::pipeline::{visualize, VisualizeOptions};
use async_trace_studio::utils::error::{CollectError, TerminationError};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

fn sh(script: &str, args: &[&Path]) -> Vec<String> {
    let mut command = vec![
        "sh".to_string(),
        "-c".to_string(),
        script.to_string(),
        "sh".to_string(),
    ];
    command.extend(args.iter().map(|arg| arg.display().to_string()));
    command
}

fn options(base_dir: &Path) -> CollectOptions {
    CollectOptions {
        hook_path: base_dir.join("hook.js"),
        base_dir: base_dir.to_path_buf(),
        trace_event_source: base_dir.join("node_trace.1.log"),
    }
}

#[test]
fn test_nonzero_exit_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    let err = collect(
        &sh("exit 3", &[]),
        &options(temp_dir.path()),
        &InterruptRelay::new(),
    )
    .unwrap_err();

    match &err {
        CollectError::Termination { source, .. } => {
            assert_eq!(source, &TerminationError::ExitCode(3))
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.to_string().contains("exit code 3"));
    assert!(err.log_dir().is_some());
}

#[test]
fn test_fatal_signal_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    let err = collect(
        &sh("kill -TERM $$", &[]),
        &options(temp_dir.path()),
        &InterruptRelay::new(),
    )
    .unwrap_err();

    assert_eq!(err.to_string(), "process exited by signal SIGTERM");
}

#[test]
fn test_interrupt_counts_as_success() {
    let temp_dir = tempfile::tempdir().unwrap();
    let options = options(temp_dir.path());
    fs::write(&options.trace_event_source, "{\"traceEvents\":[]}").unwrap();

    let collection = collect(&sh("kill -INT $$", &[]), &options, &InterruptRelay::new()).unwrap();

    assert_eq!(collection.termination, Termination::Interrupted);
    let paths = LoggingPaths::for_run(temp_dir.path(), &collection.identifier);
    assert_eq!(
        fs::read_to_string(&paths.trace_event).unwrap(),
        "{\"traceEvents\":[]}"
    );
    assert!(!options.trace_event_source.exists());
}

#[test]
fn test_interrupt_is_forwarded_to_child() {
    let temp_dir = tempfile::tempdir().unwrap();
    let options = options(temp_dir.path());
    let relay = InterruptRelay::new();
    let command = sh(": > \"$1\"; exec sleep 30", &[&options.trace_event_source]);

    let collection = thread::scope(|scope| {
        let run = scope.spawn(|| collect(&command, &options, &relay));

        // wait for the child to be attached and to have written its trace log
        let deadline = Instant::now() + Duration::from_secs(10);
        while relay.attached().is_empty() || !options.trace_event_source.exists() {
            assert!(Instant::now() < deadline, "child never started");
            thread::sleep(Duration::from_millis(10));
        }
        assert!(relay.interrupt());

        run.join().unwrap()
    })
    .unwrap();

    assert_eq!(collection.termination, Termination::Interrupted);
    assert!(relay.attached().is_empty());
    let paths = LoggingPaths::from_directory(&collection.log_dir).unwrap();
    assert!(paths.trace_event.is_file());
    assert!(!options.trace_event_source.exists());
}

#[test]
fn test_clean_exit_relocates_trace_log() {
    let temp_dir = tempfile::tempdir().unwrap();
    let options = options(temp_dir.path());

    // the target writes the trace log itself, like the runtime does
    let collection = collect(
        &sh("printf x > \"$1\"", &[&options.trace_event_source]),
        &options,
        &InterruptRelay::new(),
    )
    .unwrap();

    assert_eq!(collection.termination, Termination::Exited);
    assert_eq!(
        collection.log_dir,
        temp_dir
            .path()
            .join(format!("{}.async-trace", collection.identifier))
    );
    let paths = LoggingPaths::from_directory(&collection.log_dir).unwrap();
    assert_eq!(fs::read_to_string(&paths.trace_event).unwrap(), "x");
}

#[test]
fn test_missing_trace_log_is_relocation_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let err = collect(
        &sh("exit 0", &[]),
        &options(temp_dir.path()),
        &InterruptRelay::new(),
    )
    .unwrap_err();

    assert!(matches!(err, CollectError::Relocation { .. }));
}

#[test]
fn test_launch_failure() {
    let temp_dir = tempfile::tempdir().unwrap();
    let command = vec!["/nonexistent/async-trace-target".to_string()];
    let err = collect(&command, &options(temp_dir.path()), &InterruptRelay::new()).unwrap_err();

    assert!(matches!(err, CollectError::Launch { .. }));
    assert!(err.log_dir().is_none());
}

#[test]
fn test_child_environment() {
    let temp_dir = tempfile::tempdir().unwrap();
    let options = options(temp_dir.path());
    let seen = temp_dir.path().join("seen");

    collect(
        &sh(
            "printf '%s\\n%s' \"$NODE_OPTIONS\" \"$ASYNC_TRACE_BASE_DIR\" > \"$1\" && : > \"$2\"",
            &[&seen, &options.trace_event_source],
        ),
        &options,
        &InterruptRelay::new(),
    )
    .unwrap();

    let seen = fs::read_to_string(&seen).unwrap();
    let mut lines = seen.lines();
    let node_options = lines.next().unwrap();
    assert!(node_options.starts_with(&format!("-r {} ", options.hook_path.display())));
    assert!(node_options
        .contains("--trace-events-enabled --trace-event-categories node.async_hooks"));
    assert_eq!(lines.next().unwrap(), temp_dir.path().display().to_string());
}

#[test]
fn test_collect_then_visualize() {
    let temp_dir = tempfile::tempdir().unwrap();
    let options = options(temp_dir.path());

    let fixtures = temp_dir.path().join("fixtures");
    fs::create_dir(&fixtures).unwrap();
    fs::write(
        fixtures.join("systeminfo"),
        r#"{"pid":1,"main":null,"providers":[],"nodeVersions":{}}"#,
    )
    .unwrap();
    fs::write(
        fixtures.join("stacktrace"),
        "{\"asyncId\":2,\"frames\":[]}\n",
    )
    .unwrap();
    fs::write(
        fixtures.join("traceevent"),
        r#"{"traceEvents":[{"ts":1000,"ph":"b","cat":"node.async_hooks","name":"Timeout","id":"0x2","args":{}}]}"#,
    )
    .unwrap();

    // stands in for the hook: the shell's pid is the run identifier
    let script = r#"
        dir="$ASYNC_TRACE_BASE_DIR/$$.async-trace"
        mkdir -p "$dir"
        cp "$1/systeminfo" "$dir/$$.async-trace-systeminfo"
        cp "$1/stacktrace" "$dir/$$.async-trace-stacktrace"
        cp "$1/traceevent" "$2"
    "#;
    let collection = collect(
        &sh(script, &[&fixtures, &options.trace_event_source]),
        &options,
        &InterruptRelay::new(),
    )
    .unwrap();

    let paths = LoggingPaths::from_directory(&collection.log_dir).unwrap();
    for kind in LogKind::FILES {
        let len = fs::metadata(paths.get(kind)).unwrap().len();
        assert!(len > 0, "{} log is empty", kind.name());
    }

    let output = temp_dir.path().join("report.html");
    let sources = ArtifactSources::from_assets_dir(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets"),
    );
    let embedded: u64 = std::iter::once(&sources.style)
        .chain(&sources.assets)
        .map(|path| fs::metadata(path).unwrap().len())
        .sum();
    let summary = visualize(&collection.log_dir, &output, &VisualizeOptions { sources }).unwrap();

    assert_eq!(summary.records, 3);
    assert_eq!(fs::metadata(&output).unwrap().len(), summary.bytes);
    assert!(summary.bytes > embedded);
    let expected = LoggingPaths::for_run(
        temp_dir.path(),
        &RunIdentifier::new(collection.identifier.as_str()),
    );
    assert_eq!(expected.root, collection.log_dir);
}
