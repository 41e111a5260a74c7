//! Decoder threads and the record streams they feed.
//!
//! Each log file is decoded on its own thread and handed over through a
//! bounded channel, so a slow consumer throttles the reader instead of
//! letting records pile up. Dropping a [`RecordStream`] disconnects the
//! channel; the producer notices on its next send and stops reading.

use crate::utils::config::DECODER_CHANNEL_CAPACITY;
use crate::utils::error::DecodeError;
use crossbeam_channel::{bounded, Receiver};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

/// A lazily decoded, order-preserving sequence of records from one log file
pub struct RecordStream<T> {
    path: PathBuf,
    rx: Receiver<Result<T, DecodeError>>,
    handle: Option<JoinHandle<()>>,
    finished: bool,
}

impl<T> RecordStream<T> {
    /// Log file this stream decodes
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Send + 'static> RecordStream<T> {
    /// Stream over already decoded results, without a producer thread
    ///
    /// **Public** - lets analysis engines be tested without log files
    pub fn from_results(
        path: impl Into<PathBuf>,
        results: impl IntoIterator<Item = Result<T, DecodeError>>,
    ) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        for result in results {
            let _ = tx.send(result);
        }
        Self {
            path: path.into(),
            rx,
            handle: None,
            finished: false,
        }
    }
}

impl<T> Iterator for RecordStream<T> {
    type Item = Result<T, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.rx.recv() {
            Ok(Ok(record)) => Some(Ok(record)),
            Ok(Err(e)) => {
                self.finished = true;
                Some(Err(e))
            }
            Err(_) => {
                self.finished = true;
                // A panicking decoder also disconnects; that must not read as a clean end
                match self.handle.take().map(JoinHandle::join) {
                    Some(Err(_)) => Some(Err(DecodeError::Format(format!(
                        "decoder for {} panicked",
                        self.path.display()
                    )))),
                    _ => None,
                }
            }
        }
    }
}

/// Decode `path` on a dedicated thread
///
/// **Public** - main entry point for concurrent decoding
///
/// # Arguments
/// * `path` - log file to read
/// * `decoder` - builds the decoding iterator over the opened file
///
/// # Returns
/// A stream yielding records in file order. Open and read failures arrive
/// as an `Err` item, after which the stream ends.
pub fn spawn_decoder<T, D, F>(path: impl Into<PathBuf>, decoder: F) -> RecordStream<T>
where
    T: Send + 'static,
    D: Iterator<Item = Result<T, DecodeError>>,
    F: FnOnce(BufReader<File>) -> D + Send + 'static,
{
    let path = path.into();
    let (tx, rx) = bounded(DECODER_CHANNEL_CAPACITY);
    let thread_path = path.clone();

    let name = path
        .file_name()
        .map(|name| format!("decode {}", name.to_string_lossy()))
        .unwrap_or_else(|| "decode".to_string());

    let spawned = std::thread::Builder::new().name(name).spawn(move || {
        let file = match File::open(&thread_path) {
            Ok(file) => file,
            Err(source) => {
                let _ = tx.send(Err(DecodeError::Open {
                    path: thread_path,
                    source,
                }));
                return;
            }
        };

        let mut count = 0usize;
        for result in decoder(BufReader::new(file)) {
            let failed = result.is_err();
            if tx.send(result).is_err() {
                debug!("Consumer of {} went away after {} records", thread_path.display(), count);
                return;
            }
            if failed {
                return;
            }
            count += 1;
        }
        debug!("Decoded {} records from {}", count, thread_path.display());
    });

    match spawned {
        Ok(handle) => RecordStream {
            path,
            rx,
            handle: Some(handle),
            finished: false,
        },
        Err(e) => RecordStream::from_results(path, [Err(DecodeError::Io(e))]),
    }
}
