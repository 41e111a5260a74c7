//! Decoded telemetry records.
//!
//! One record type per log kind. Records only live until the analysis stage
//! has consumed them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Process-level metadata written once by the instrumentation hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfoRecord {
    /// Pid of the traced process
    pub pid: u32,

    /// Entry script of the traced program, if any
    #[serde(default)]
    pub main: Option<String>,

    /// Async resource types known to the runtime
    #[serde(default)]
    pub providers: Vec<String>,

    /// Runtime component versions (node, v8, uv, ...)
    #[serde(default)]
    pub node_versions: BTreeMap<String, String>,

    /// When the hook started recording
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

/// One call site in a captured stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    #[serde(default)]
    pub function_name: String,

    #[serde(default)]
    pub file_name: String,

    #[serde(default)]
    pub line_number: u32,

    #[serde(default)]
    pub column_number: u32,
}

impl StackFrame {
    /// `function (file:line:column)`, with `<anonymous>` for unnamed functions
    pub fn format(&self) -> String {
        let name = if self.function_name.is_empty() {
            "<anonymous>"
        } else {
            &self.function_name
        };
        format!(
            "{} ({}:{}:{})",
            name, self.file_name, self.line_number, self.column_number
        )
    }
}

/// Stack captured when an async resource was created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceRecord {
    pub async_id: u64,

    #[serde(default)]
    pub frames: Vec<StackFrame>,
}

/// Lifecycle point of an async resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceEventKind {
    Init,
    Before,
    After,
    Destroy,
}

/// One async_hooks lifecycle event from the runtime's trace log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEventRecord {
    pub kind: TraceEventKind,

    /// Resource type, e.g. `TIMERWRAP` or `FSREQCALLBACK`
    #[serde(rename = "type")]
    pub resource_type: String,

    pub async_id: u64,

    #[serde(default)]
    pub trigger_async_id: Option<u64>,

    #[serde(default)]
    pub execution_async_id: Option<u64>,

    /// Milliseconds on the runtime's trace clock
    pub timestamp: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_format() {
        let frame = StackFrame {
            function_name: "listen".to_string(),
            file_name: "/app/server.js".to_string(),
            line_number: 12,
            column_number: 5,
        };
        assert_eq!(frame.format(), "listen (/app/server.js:12:5)");
    }

    #[test]
    fn test_frame_format_anonymous() {
        let frame = StackFrame {
            function_name: String::new(),
            file_name: "a.js".to_string(),
            line_number: 1,
            column_number: 1,
        };
        assert_eq!(frame.format(), "<anonymous> (a.js:1:1)");
    }

    #[test]
    fn test_system_info_optional_fields() {
        let record: SystemInfoRecord = serde_json::from_str(r#"{"pid": 10}"#).unwrap();
        assert_eq!(record.pid, 10);
        assert!(record.providers.is_empty());
        assert!(record.collected_at.is_none());
    }
}
