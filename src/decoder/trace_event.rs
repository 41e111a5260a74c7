//! Trace event log decoder.
//!
//! Node's tracing facility writes Chrome trace format:
//!
//! ```text
//! {"traceEvents":[{"pid":1,"tid":1,"ts":1200,"ph":"b","cat":"node,node.async_hooks",
//!   "name":"TIMERWRAP","id":"0x5","args":{"data":{"triggerAsyncId":1,"executionAsyncId":1}}}, ...]}
//! ```
//!
//! The array is scanned one element at a time so arbitrarily large logs never
//! have to be held in memory. Only async_hooks events are kept: a `b`/`e`
//! pair on `X` marks init/destroy of resource type `X`, a pair on
//! `X_CALLBACK` brackets one callback invocation.

use super::schema::{TraceEventKind, TraceEventRecord};
use crate::utils::config::TRACE_EVENT_CATEGORIES;
use crate::utils::error::DecodeError;
use log::debug;
use serde::Deserialize;
use std::io::{self, BufRead};

const CALLBACK_SUFFIX: &str = "_CALLBACK";

#[derive(Debug, Deserialize)]
struct RawTraceEvent {
    #[serde(default)]
    cat: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    ph: String,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    ts: f64,
    #[serde(default)]
    args: RawArgs,
}

#[derive(Debug, Default, Deserialize)]
struct RawArgs {
    #[serde(default)]
    data: Option<RawData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawData {
    #[serde(default)]
    trigger_async_id: Option<u64>,
    #[serde(default)]
    execution_async_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Preamble,
    Elements,
    Done,
}

/// Yields [`TraceEventRecord`]s in file order
pub struct TraceEventDecoder<R> {
    reader: R,
    state: ScanState,
    element: Vec<u8>,
    index: usize,
}

impl<R: BufRead> TraceEventDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: ScanState::Preamble,
            element: Vec::new(),
            index: 0,
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = self.reader.fill_buf()?.first().copied();
        if byte.is_some() {
            self.reader.consume(1);
        }
        Ok(byte)
    }

    fn next_significant_byte(&mut self) -> io::Result<Option<u8>> {
        while let Some(byte) = self.next_byte()? {
            if !byte.is_ascii_whitespace() {
                return Ok(Some(byte));
            }
        }
        Ok(None)
    }

    /// Skip `{"traceEvents":` up to and including the array's `[`
    fn read_preamble(&mut self) -> Result<(), DecodeError> {
        match self.next_significant_byte()? {
            Some(b'{') => {}
            Some(other) => {
                return Err(DecodeError::Format(format!(
                    "expected a trace object, found '{}'",
                    other as char
                )))
            }
            None => return Err(DecodeError::Truncated("trace event log is empty".to_string())),
        }

        let mut in_string = false;
        let mut escaped = false;
        while let Some(byte) = self.next_byte()? {
            if in_string {
                match byte {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
            } else {
                match byte {
                    b'"' => in_string = true,
                    b'[' => return Ok(()),
                    _ => {}
                }
            }
        }
        Err(DecodeError::Truncated(
            "trace event log ends before the event array".to_string(),
        ))
    }

    /// Read one complete `{...}` element into `self.element`, assuming `{` was consumed
    fn read_element(&mut self) -> Result<(), DecodeError> {
        self.element.clear();
        self.element.push(b'{');

        let mut depth = 1usize;
        let mut in_string = false;
        let mut escaped = false;
        while let Some(byte) = self.next_byte()? {
            self.element.push(byte);
            if in_string {
                match byte {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match byte {
                b'"' => in_string = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(DecodeError::Truncated(format!(
            "trace event {} is incomplete",
            self.index
        )))
    }

    /// After the closing `]`, only the enclosing object's `}` may follow
    fn read_epilogue(&mut self) -> Result<(), DecodeError> {
        match self.next_significant_byte()? {
            Some(b'}') => {}
            Some(other) => {
                return Err(DecodeError::Format(format!(
                    "unexpected '{}' after the event array",
                    other as char
                )))
            }
            None => {
                return Err(DecodeError::Truncated(
                    "trace event log ends before its closing brace".to_string(),
                ))
            }
        }
        match self.next_significant_byte()? {
            None => Ok(()),
            Some(other) => Err(DecodeError::Format(format!(
                "unexpected '{}' after the trace object",
                other as char
            ))),
        }
    }

    /// Advance to the next raw element, or `None` at the end of the array
    fn next_element(&mut self) -> Result<Option<RawTraceEvent>, DecodeError> {
        if self.state == ScanState::Preamble {
            self.read_preamble()?;
            self.state = ScanState::Elements;
        }

        loop {
            match self.next_significant_byte()? {
                Some(b',') if self.index > 0 => continue,
                Some(b'{') => break,
                Some(b']') => {
                    self.read_epilogue()?;
                    self.state = ScanState::Done;
                    return Ok(None);
                }
                Some(other) => {
                    return Err(DecodeError::Format(format!(
                        "unexpected '{}' in the event array",
                        other as char
                    )))
                }
                None => {
                    return Err(DecodeError::Truncated(
                        "trace event log ends inside the event array".to_string(),
                    ))
                }
            }
        }

        self.read_element()?;
        let location = format!("trace event {}", self.index);
        self.index += 1;

        serde_json::from_slice(&self.element)
            .map(Some)
            .map_err(|source| DecodeError::Json { location, source })
    }
}

impl<R: BufRead> Iterator for TraceEventDecoder<R> {
    type Item = Result<TraceEventRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.state != ScanState::Done {
            let raw = match self.next_element() {
                Ok(Some(raw)) => raw,
                Ok(None) => return None,
                Err(e) => {
                    self.state = ScanState::Done;
                    return Some(Err(e));
                }
            };

            match to_record(raw) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => {
                    self.state = ScanState::Done;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Convert a raw event, skipping everything that is not an async_hooks lifecycle event
fn to_record(raw: RawTraceEvent) -> Result<Option<TraceEventRecord>, DecodeError> {
    if !raw.cat.split(',').any(|cat| cat == TRACE_EVENT_CATEGORIES) {
        return Ok(None);
    }

    let (resource_type, is_callback) = match raw.name.strip_suffix(CALLBACK_SUFFIX) {
        Some(resource_type) => (resource_type.to_string(), true),
        None => (raw.name.clone(), false),
    };

    let kind = match (raw.ph.as_str(), is_callback) {
        ("b", false) => TraceEventKind::Init,
        ("e", false) => TraceEventKind::Destroy,
        ("b", true) => TraceEventKind::Before,
        ("e", true) => TraceEventKind::After,
        (phase, _) => {
            debug!("Skipping {} event with phase '{}'", raw.name, phase);
            return Ok(None);
        }
    };

    let async_id = raw
        .id
        .as_ref()
        .and_then(parse_async_id)
        .ok_or_else(|| DecodeError::Format(format!("{} event has no usable id", raw.name)))?;

    let data = raw.args.data;
    Ok(Some(TraceEventRecord {
        kind,
        resource_type,
        async_id,
        trigger_async_id: data.as_ref().and_then(|d| d.trigger_async_id),
        execution_async_id: data.as_ref().and_then(|d| d.execution_async_id),
        timestamp: raw.ts / 1000.0,
    }))
}

/// Ids are hex strings (`"0x1f"`), occasionally plain numbers
fn parse_async_id(id: &serde_json::Value) -> Option<u64> {
    match id {
        serde_json::Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}
