//! Stream handles for the standard I/O globals.
//!
//! `$stdout`, `$stderr` and `$stdin` hold a [`SharedStream`]. Output can be
//! directed to different destinations:
//! - Native: the process's stdout/stderr (default)
//! - Buffer: captured in memory for tests and embedding hosts
//! - Null: discarded
//!
//! Uses enum dispatch instead of trait objects, like the rest of the value
//! layer.

use std::io::{BufRead, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// Writes to the process's stdout.
#[derive(Default)]
pub struct StdoutStream;

impl StdoutStream {
    pub fn write(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout is not an error the binding layer can act on.
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

/// Writes to the process's stderr.
#[derive(Default)]
pub struct StderrStream;

impl StderrStream {
    pub fn write(&self, text: &str) {
        let _ = std::io::stderr().lock().write_all(text.as_bytes());
    }
}

/// Reads records from the process's stdin.
#[derive(Default)]
pub struct StdinStream;

impl StdinStream {
    /// Read one record terminated by `separator` (or the rest of input when
    /// `separator` is `None`). Returns `None` at end of input.
    pub fn read_record(&self, separator: Option<&str>) -> Option<String> {
        let stdin = std::io::stdin();
        let mut lock = stdin.lock();
        let mut bytes = Vec::new();
        match separator {
            None => {
                let mut rest = String::new();
                std::io::Read::read_to_string(&mut lock, &mut rest).ok()?;
                bytes.extend_from_slice(rest.as_bytes());
            }
            Some(sep) => {
                let sep = sep.as_bytes();
                let Some(&last) = sep.last() else {
                    return None;
                };
                loop {
                    let read = lock.read_until(last, &mut bytes).ok()?;
                    if read == 0 || bytes.ends_with(sep) {
                        break;
                    }
                }
            }
        }
        if bytes.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

/// In-memory stream: captures written output and serves queued input.
pub struct BufferStream {
    output: Mutex<String>,
    input: Mutex<String>,
}

impl BufferStream {
    pub fn new() -> Self {
        Self::with_input(String::new())
    }

    pub fn with_input(input: impl Into<String>) -> Self {
        BufferStream {
            output: Mutex::new(String::new()),
            input: Mutex::new(input.into()),
        }
    }

    pub fn write(&self, text: &str) {
        self.output.lock().push_str(text);
    }

    pub fn get_output(&self) -> String {
        self.output.lock().clone()
    }

    pub fn clear(&self) {
        self.output.lock().clear();
    }

    /// Pop one record terminated by `separator` from the queued input.
    pub fn read_record(&self, separator: Option<&str>) -> Option<String> {
        let mut input = self.input.lock();
        if input.is_empty() {
            return None;
        }
        let end = separator
            .filter(|sep| !sep.is_empty())
            .and_then(|sep| input.find(sep).map(|at| at + sep.len()))
            .unwrap_or(input.len());
        let rest = input.split_off(end);
        Some(std::mem::replace(&mut *input, rest))
    }
}

impl Default for BufferStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream implementation using enum dispatch.
pub enum StreamImpl {
    Stdout(StdoutStream),
    Stderr(StderrStream),
    Stdin(StdinStream),
    Buffer(BufferStream),
    /// Discards output and yields no input.
    Null,
}

impl StreamImpl {
    /// Write text without adding a separator.
    pub fn write(&self, text: &str) {
        match self {
            Self::Stdout(s) => s.write(text),
            Self::Stderr(s) => s.write(text),
            Self::Buffer(s) => s.write(text),
            Self::Stdin(_) | Self::Null => {}
        }
    }

    /// Read one record; `None` at end of input or for write-only streams.
    pub fn read_record(&self, separator: Option<&str>) -> Option<String> {
        match self {
            Self::Stdin(s) => s.read_record(separator),
            Self::Buffer(s) => s.read_record(separator),
            Self::Stdout(_) | Self::Stderr(_) | Self::Null => None,
        }
    }

    /// Captured output; empty for streams that don't capture.
    pub fn get_output(&self) -> String {
        match self {
            Self::Buffer(s) => s.get_output(),
            _ => String::new(),
        }
    }

    /// Clear captured output. No-op for streams that don't capture.
    pub fn clear(&self) {
        if let Self::Buffer(s) = self {
            s.clear();
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Stdout(_) => "stdout",
            Self::Stderr(_) => "stderr",
            Self::Stdin(_) => "stdin",
            Self::Buffer(_) => "buffer",
            Self::Null => "null",
        }
    }
}

impl std::fmt::Debug for StreamImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<IO:{}>", self.kind_name())
    }
}

/// Shared stream handle stored in `Value::Stream`.
pub type SharedStream = Arc<StreamImpl>;

pub fn stdout_stream() -> SharedStream {
    Arc::new(StreamImpl::Stdout(StdoutStream))
}

pub fn stderr_stream() -> SharedStream {
    Arc::new(StreamImpl::Stderr(StderrStream))
}

pub fn stdin_stream() -> SharedStream {
    Arc::new(StreamImpl::Stdin(StdinStream))
}

/// Create a buffer stream for capturing output.
pub fn buffer_stream() -> SharedStream {
    Arc::new(StreamImpl::Buffer(BufferStream::new()))
}

/// Create a buffer stream pre-loaded with input to read.
pub fn buffer_stream_with_input(input: impl Into<String>) -> SharedStream {
    Arc::new(StreamImpl::Buffer(BufferStream::with_input(input)))
}

pub fn null_stream() -> SharedStream {
    Arc::new(StreamImpl::Null)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
