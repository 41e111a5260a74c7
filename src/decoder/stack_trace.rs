//! Stack trace log decoder.
//!
//! One JSON object per line, each terminated by `\n`. The hook appends a
//! line whenever an async resource is created, so an unterminated last line
//! means the log was cut mid-record.

use super::schema::StackTraceRecord;
use crate::utils::error::DecodeError;
use std::io::BufRead;

/// Yields [`StackTraceRecord`]s in file order
pub struct StackTraceDecoder<R> {
    reader: R,
    line: Vec<u8>,
    line_number: usize,
    done: bool,
}

impl<R: BufRead> StackTraceDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            line_number: 0,
            done: false,
        }
    }

    fn fail(&mut self, error: DecodeError) -> Option<Result<StackTraceRecord, DecodeError>> {
        self.done = true;
        Some(Err(error))
    }
}

impl<R: BufRead> Iterator for StackTraceDecoder<R> {
    type Item = Result<StackTraceRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.line.clear();
            let read = match self.reader.read_until(b'\n', &mut self.line) {
                Ok(read) => read,
                Err(e) => return self.fail(DecodeError::Io(e)),
            };
            if read == 0 {
                self.done = true;
                return None;
            }
            self.line_number += 1;

            if self.line.last() != Some(&b'\n') {
                let message = format!("line {} is not terminated", self.line_number);
                return self.fail(DecodeError::Truncated(message));
            }

            let content = trim_whitespace(&self.line);
            if content.is_empty() {
                continue;
            }

            return match serde_json::from_slice(content) {
                Ok(record) => Some(Ok(record)),
                Err(source) => {
                    let location = format!("line {}", self.line_number);
                    self.fail(DecodeError::Json { location, source })
                }
            };
        }
        None
    }
}

fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    const STACK_TRACES: &str = concat!(
        r#"{"asyncId":2,"frames":[{"functionName":"setTimeout","fileName":"timers.js","lineNumber":1,"columnNumber":2}]}"#,
        "\n",
        "\n",
        r#"{"asyncId":3,"frames":[]}"#,
        "\n",
    );

    #[test]
    fn test_decode_in_order() {
        let records: Vec<_> = StackTraceDecoder::new(STACK_TRACES.as_bytes())
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].async_id, 2);
        assert_eq!(records[0].frames[0].function_name, "setTimeout");
        assert_eq!(records[1].async_id, 3);
    }

    #[test]
    fn test_empty_log() {
        assert_eq!(StackTraceDecoder::new("".as_bytes()).count(), 0);
    }

    #[test]
    fn test_truncated_record() {
        let truncated = &STACK_TRACES[..STACK_TRACES.len() - 5];
        let results: Vec<_> = StackTraceDecoder::new(truncated.as_bytes()).collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(DecodeError::Truncated(_))));
    }

    #[test]
    fn test_malformed_line_stops_decoding() {
        let input = "{\"asyncId\":1}\nnot json\n{\"asyncId\":2}\n";
        let results: Vec<_> = StackTraceDecoder::new(input.as_bytes()).collect();

        assert_eq!(results.len(), 2);
        match &results[1] {
            Err(DecodeError::Json { location, .. }) => assert_eq!(location, "line 2"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
