//! Container log demultiplexing.
//!
//! The engine returns a container's stdout and stderr as one stream of
//! framed chunks. These helpers split it back into two sinks, rewriting every
//! non-blank line as `[<container-name>]: <line>`.

use bollard::container::LogOutput;
use std::io::{self, Write};
use tracing::warn;

/// Line-prefixing writer for one container output stream.
///
/// Each `write` splits the chunk on newlines, drops blank lines and emits
/// the rest with the container name as prefix. The reported byte count is
/// always the input length, however many bytes were actually emitted: the
/// caller framing the stream must see every chunk as fully consumed.
#[derive(Debug)]
pub struct ContainerLogWriter<W: Write> {
    name: String,
    dst: W,
}

impl<W: Write> ContainerLogWriter<W> {
    /// Create a writer prefixing lines with `name`.
    pub fn new<S: Into<String>>(name: S, dst: W) -> Self {
        Self {
            name: name.into(),
            dst,
        }
    }

    /// Recover the underlying sink.
    pub fn into_inner(self) -> W {
        self.dst
    }
}

impl<W: Write> Write for ContainerLogWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(data);
        for line in text.split('\n') {
            if line.trim().is_empty() {
                continue;
            }
            let line = line.trim_end_matches('\r');
            writeln!(self.dst, "[{}]: {}", self.name, line)?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.dst.flush()
    }
}

/// Route framed log chunks to `stdout`/`stderr` with per-line prefixes.
///
/// Console output (TTY containers) is treated as stdout; stdin echoes are
/// ignored. Returns the number of input bytes consumed.
///
/// # Errors
///
/// Returns the first error raised by either sink.
pub fn demux_logs<I, O, E>(name: &str, chunks: I, stdout: O, stderr: E) -> io::Result<usize>
where
    I: IntoIterator<Item = LogOutput>,
    O: Write,
    E: Write,
{
    let mut out = ContainerLogWriter::new(name, stdout);
    let mut err = ContainerLogWriter::new(name, stderr);
    let mut consumed = 0;

    for chunk in chunks {
        match chunk {
            LogOutput::StdOut { message } | LogOutput::Console { message } => {
                out.write_all(&message)?;
                consumed += message.len();
            }
            LogOutput::StdErr { message } => {
                err.write_all(&message)?;
                consumed += message.len();
            }
            LogOutput::StdIn { .. } => {}
        }
    }

    out.flush()?;
    err.flush()?;
    Ok(consumed)
}

/// Print a container's log chunks to the process's stdout and stderr.
///
/// Sink failures are reported, never propagated.
pub fn print_container_logs<I>(name: &str, chunks: I)
where
    I: IntoIterator<Item = LogOutput>,
{
    if let Err(e) = demux_logs(name, chunks, io::stdout().lock(), io::stderr().lock()) {
        warn!(container = %name, "Failed to print the logs of container: {}", e);
    }
}
