//! Analysis of decoded telemetry.
//!
//! An [`Analysis`] turns the three decoded streams of a run into a stream of
//! serializable records for the visualizer. The pipeline only depends on the
//! trait; [`AsyncGraphAnalysis`] is the engine used by default.

pub mod graph_builder;
pub mod metrics;
pub mod schema;

// Re-export main types and functions
pub use graph_builder::GraphBuilder;
pub use metrics::summarize;
pub use schema::{AnalysisRecord, AnalysisSummary, AsyncNode, CallbackInterval, RunInfo};

use crate::decoder::{DecodedStreams, RecordStream, SystemInfoRecord};
use crate::utils::error::AnalysisError;
use log::{debug, info};
use serde::Serialize;

/// A stage turning decoded telemetry into visualizer records
///
/// Any input failure must surface as an `Err` item of the output, after
/// which the output ends.
pub trait Analysis {
    type Record: Serialize;
    type Output: Iterator<Item = Result<Self::Record, AnalysisError>>;

    fn analyze(self, streams: DecodedStreams) -> Self::Output;
}

/// Default engine: one node per async resource, framed by the run's system
/// info and a summary
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncGraphAnalysis;

impl Analysis for AsyncGraphAnalysis {
    type Record = AnalysisRecord;
    type Output = AsyncGraphRecords;

    fn analyze(self, streams: DecodedStreams) -> AsyncGraphRecords {
        AsyncGraphRecords {
            state: State::Pending(Box::new(streams)),
        }
    }
}

enum State {
    Pending(Box<DecodedStreams>),
    Emitting(std::vec::IntoIter<AnalysisRecord>),
    Done,
}

/// Output of [`AsyncGraphAnalysis`]; the join runs on the first `next`
pub struct AsyncGraphRecords {
    state: State,
}

impl Iterator for AsyncGraphRecords {
    type Item = Result<AnalysisRecord, AnalysisError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, State::Done) {
                State::Pending(streams) => match build_records(*streams) {
                    Ok(records) => self.state = State::Emitting(records.into_iter()),
                    Err(e) => return Some(Err(e)),
                },
                State::Emitting(mut records) => {
                    let record = records.next()?;
                    self.state = State::Emitting(records);
                    return Some(Ok(record));
                }
                State::Done => return None,
            }
        }
    }
}

/// Join all three streams into the ordered record list
///
/// **Private** - internal helper for AsyncGraphRecords
fn build_records(streams: DecodedStreams) -> Result<Vec<AnalysisRecord>, AnalysisError> {
    let DecodedStreams {
        system_info,
        stack_traces,
        trace_events,
    } = streams;

    let run_info = first_system_info(system_info)?;

    let mut builder = GraphBuilder::new();
    drain(trace_events, |event| builder.add_event(event))?;
    drain(stack_traces, |trace| builder.add_stack_trace(trace))?;

    info!("Analyzed {} async resources", builder.len());

    let orphaned = builder.orphaned_events;
    let unmatched = builder.unmatched_stack_traces;
    let nodes = builder.into_nodes();
    let summary = summarize(&nodes, orphaned, unmatched);

    let mut records = Vec::with_capacity(nodes.len() + 2);
    records.push(AnalysisRecord::SystemInfo(run_info));
    records.extend(nodes.into_iter().map(AnalysisRecord::AsyncNode));
    records.push(AnalysisRecord::Summary(summary));
    Ok(records)
}

fn first_system_info(
    mut stream: RecordStream<SystemInfoRecord>,
) -> Result<RunInfo, AnalysisError> {
    let path = stream.path().to_path_buf();
    let record = stream
        .next()
        .ok_or(AnalysisError::MissingSystemInfo)?
        .map_err(|source| AnalysisError::Decode { path, source })?;

    debug!("System info: pid {}, {} providers", record.pid, record.providers.len());

    Ok(RunInfo {
        pid: record.pid,
        main: record.main,
        providers: record.providers,
        node_versions: record.node_versions,
        collected_at: record.collected_at.map(|at| at.to_rfc3339()),
    })
}

/// Feed every record of a stream to `sink`, stopping at the first decode failure
fn drain<T>(stream: RecordStream<T>, mut sink: impl FnMut(T)) -> Result<(), AnalysisError> {
    let path = stream.path().to_path_buf();
    for record in stream {
        match record {
            Ok(record) => sink(record),
            Err(source) => {
                return Err(AnalysisError::Decode {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
    Ok(())
}
