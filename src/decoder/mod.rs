//! Telemetry log decoding.
//!
//! This module handles:
//! - Decoding the system info, stack trace and trace event logs
//! - Running each decoder on its own thread behind a bounded channel
//! - Defining the decoded record types

pub mod schema;
pub mod stack_trace;
pub mod stream;
pub mod system_info;
pub mod trace_event;

// Re-export main types
pub use schema::{
    StackFrame, StackTraceRecord, SystemInfoRecord, TraceEventKind, TraceEventRecord,
};
pub use stack_trace::StackTraceDecoder;
pub use stream::{spawn_decoder, RecordStream};
pub use system_info::SystemInfoDecoder;
pub use trace_event::TraceEventDecoder;

use crate::collect::LoggingPaths;

/// The three decoded streams of one run
pub struct DecodedStreams {
    pub system_info: RecordStream<SystemInfoRecord>,
    pub stack_traces: RecordStream<StackTraceRecord>,
    pub trace_events: RecordStream<TraceEventRecord>,
}

/// Start decoding every log of a run concurrently
///
/// **Public** - entry point of the visualize pipeline
pub fn open_streams(paths: &LoggingPaths) -> DecodedStreams {
    DecodedStreams {
        system_info: spawn_decoder(&paths.system_info, SystemInfoDecoder::new),
        stack_traces: spawn_decoder(&paths.stack_trace, StackTraceDecoder::new),
        trace_events: spawn_decoder(&paths.trace_event, TraceEventDecoder::new),
    }
}
