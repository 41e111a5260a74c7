//! Streaming serialization of analysis records.
//!
//! Records are written one at a time as a JSON array:
//!
//! ```text
//! [
//! {"kind":"systemInfo",...},
//! {"kind":"asyncNode",...}
//! ]
//! ```
//!
//! The full sequence is never held in memory.

use crate::utils::config::{RECORD_CLOSE, RECORD_OPEN, RECORD_SEPARATOR};
use crate::utils::error::{AnalysisError, AssemblyError};
use serde::Serialize;
use std::io::{self, Write};

/// Rewrites `</` as `<\/` so embedded data cannot close its `<script>` element
///
/// `\/` is a valid JSON string escape, so the data still parses to the same
/// values.
pub struct ScriptSafeWriter<W> {
    inner: W,
    after_lt: bool,
}

impl<W: Write> ScriptSafeWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            after_lt: false,
        }
    }
}

impl<W: Write> Write for ScriptSafeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        for (i, &byte) in buf.iter().enumerate() {
            if self.after_lt && byte == b'/' {
                self.inner.write_all(&buf[start..i])?;
                self.inner.write_all(b"\\")?;
                start = i;
            }
            self.after_lt = byte == b'<';
        }
        self.inner.write_all(&buf[start..])?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Serialize `records` into `out` in arrival order
///
/// **Public** - produces the body of the bundle's data module
///
/// # Returns
/// Number of records written
///
/// # Errors
/// * `AssemblyError::Analysis` - the record stream failed; nothing after
///   the failure is written
/// * `AssemblyError::Write` - the output rejected a write
pub fn write_records<W, T, I>(out: W, records: I) -> Result<usize, AssemblyError>
where
    W: Write,
    T: Serialize,
    I: IntoIterator<Item = Result<T, AnalysisError>>,
{
    let mut out = ScriptSafeWriter::new(out);
    out.write_all(RECORD_OPEN.as_bytes())?;

    let mut count = 0;
    for record in records {
        let record = record?;
        if count > 0 {
            out.write_all(RECORD_SEPARATOR.as_bytes())?;
        }
        serde_json::to_writer(&mut out, &record).map_err(|e| {
            if e.is_io() {
                AssemblyError::Write(e.into())
            } else {
                AssemblyError::Serialize(e)
            }
        })?;
        count += 1;
    }

    out.write_all(RECORD_CLOSE.as_bytes())?;
    Ok(count)
}
