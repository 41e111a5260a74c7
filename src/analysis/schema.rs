//! Records produced by the default analysis engine.
//!
//! These are what the visualizer script receives as its data module, one
//! JSON object per record, tagged by `kind`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One unit of analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalysisRecord {
    SystemInfo(RunInfo),
    AsyncNode(AsyncNode),
    Summary(AnalysisSummary),
}

/// Process metadata carried over from the system info log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub pid: u32,
    pub main: Option<String>,
    pub providers: Vec<String>,
    pub node_versions: BTreeMap<String, String>,

    /// RFC 3339, when known
    pub collected_at: Option<String>,
}

/// One async resource and everything observed about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncNode {
    pub async_id: u64,
    pub trigger_async_id: Option<u64>,
    pub execution_async_id: Option<u64>,

    #[serde(rename = "type")]
    pub resource_type: String,

    /// Milliseconds
    pub init: f64,
    pub destroy: Option<f64>,

    pub callbacks: Vec<CallbackInterval>,

    /// Creation stack, innermost frame first
    pub frames: Vec<String>,
}

/// One callback invocation in milliseconds; `after` is missing if the run
/// ended inside the callback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallbackInterval {
    pub before: f64,
    pub after: Option<f64>,
}

impl CallbackInterval {
    pub fn duration(&self) -> Option<f64> {
        self.after.map(|after| after - self.before)
    }
}

/// Totals across all resources of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    /// Resource count per type
    pub resources: BTreeMap<String, u64>,

    /// Total milliseconds spent in callbacks per type
    pub callback_time: BTreeMap<String, f64>,

    pub total_callbacks: u64,
    pub orphaned_events: u64,
    pub unmatched_stack_traces: u64,
}
