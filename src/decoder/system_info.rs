//! System info log decoder.
//!
//! The hook writes a single JSON object when the traced program starts.

use super::schema::SystemInfoRecord;
use crate::utils::error::DecodeError;
use std::io::{BufRead, Read};

/// Yields the one [`SystemInfoRecord`] stored in a system info log
pub struct SystemInfoDecoder<R> {
    reader: Option<R>,
}

impl<R: BufRead> SystemInfoDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }
}

impl<R: BufRead> Iterator for SystemInfoDecoder<R> {
    type Item = Result<SystemInfoRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut reader = self.reader.take()?;

        let mut content = Vec::new();
        if let Err(e) = reader.read_to_end(&mut content) {
            return Some(Err(DecodeError::Io(e)));
        }
        if content.iter().all(u8::is_ascii_whitespace) {
            return Some(Err(DecodeError::Truncated(
                "system info log is empty".to_string(),
            )));
        }

        Some(serde_json::from_slice(&content).map_err(|source| {
            if source.is_eof() {
                DecodeError::Truncated(format!("system info ends early: {}", source))
            } else {
                DecodeError::Json {
                    location: format!("line {}", source.line()),
                    source,
                }
            }
        }))
    }
}
