//! Process-wide standard streams behind `$stdout`, `$stderr` and `$stdin`.

use garnet_value::{stderr_stream, stdin_stream, stdout_stream, SharedStream};
use parking_lot::RwLock;

/// The active standard streams. Swapping one is visible to every thread.
pub struct StandardStreams {
    stdout: RwLock<SharedStream>,
    stderr: RwLock<SharedStream>,
    stdin: RwLock<SharedStream>,
}

impl StandardStreams {
    /// Streams bound to the real process stdio.
    pub fn new() -> Self {
        Self::with_streams(stdout_stream(), stderr_stream(), stdin_stream())
    }

    pub fn with_streams(stdout: SharedStream, stderr: SharedStream, stdin: SharedStream) -> Self {
        StandardStreams {
            stdout: RwLock::new(stdout),
            stderr: RwLock::new(stderr),
            stdin: RwLock::new(stdin),
        }
    }

    pub fn stdout(&self) -> SharedStream {
        self.stdout.read().clone()
    }

    pub fn stderr(&self) -> SharedStream {
        self.stderr.read().clone()
    }

    pub fn stdin(&self) -> SharedStream {
        self.stdin.read().clone()
    }

    /// Swap the active output sink.
    pub fn set_stdout(&self, stream: SharedStream) {
        tracing::debug!(sink = stream.kind_name(), "swap $stdout");
        *self.stdout.write() = stream;
    }

    pub fn set_stderr(&self, stream: SharedStream) {
        tracing::debug!(sink = stream.kind_name(), "swap $stderr");
        *self.stderr.write() = stream;
    }

    pub fn set_stdin(&self, stream: SharedStream) {
        tracing::debug!(source = stream.kind_name(), "swap $stdin");
        *self.stdin.write() = stream;
    }

    /// Write to the current output sink. The lock is released before writing.
    pub fn write_output(&self, text: &str) {
        let sink = self.stdout();
        sink.write(text);
    }

    /// Rebind all three streams to the process stdio.
    pub fn reset(&self) {
        self.set_stdout(stdout_stream());
        self.set_stderr(stderr_stream());
        self.set_stdin(stdin_stream());
    }
}

impl Default for StandardStreams {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StandardStreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardStreams")
            .field("stdout", &*self.stdout.read())
            .field("stderr", &*self.stderr.read())
            .field("stdin", &*self.stdin.read())
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
