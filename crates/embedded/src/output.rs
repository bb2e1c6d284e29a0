//! Background readers for the server's stdout and stderr.

use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::JoinHandle;
use std::time::Duration;

/// Log target for lines the server writes.
pub const SERVER_LOG_TARGET: &str = "sandboxai::server";

/// A thread forwarding every line of a child stream to the log.
///
/// The thread ends at EOF, which happens once the child exits and closes its
/// end of the pipe.
pub struct LinePump {
    stream: &'static str,
    handle: Option<JoinHandle<()>>,
    done: Receiver<()>,
}

impl LinePump {
    /// Pump `reader` to the log.
    pub fn spawn<R: Read + Send + 'static>(stream: &'static str, reader: R) -> std::io::Result<Self> {
        Self::spawn_inner(stream, reader, None)
    }

    /// Pump `reader` to the log, also handing the first non-empty line to `first_line`.
    pub fn spawn_with_first_line<R: Read + Send + 'static>(
        stream: &'static str,
        reader: R,
        first_line: SyncSender<String>,
    ) -> std::io::Result<Self> {
        Self::spawn_inner(stream, reader, Some(first_line))
    }

    fn spawn_inner<R: Read + Send + 'static>(
        stream: &'static str,
        reader: R,
        mut first_line: Option<SyncSender<String>>,
    ) -> std::io::Result<Self> {
        // Dropping `done_tx` at thread exit is the completion signal.
        let (done_tx, done) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name(format!("sandboxaid-{}", stream))
            .spawn(move || {
                let _done_tx = done_tx;
                let mut reader = BufReader::new(reader);
                let mut buf = Vec::new();
                loop {
                    buf.clear();
                    match reader.read_until(b'\n', &mut buf) {
                        Ok(0) => break,
                        Ok(_) => {
                            let line = String::from_utf8_lossy(&buf);
                            let line = line.trim_end();
                            if line.is_empty() {
                                continue;
                            }
                            if let Some(tx) = first_line.take() {
                                let _ = tx.try_send(line.to_string());
                            }
                            tracing::debug!(target: SERVER_LOG_TARGET, stream = stream, "{}", line);
                        }
                        Err(e) => {
                            tracing::warn!(stream = stream, error = %e, "Failed to read server output");
                            break;
                        }
                    }
                }
            })?;

        Ok(Self {
            stream,
            handle: Some(handle),
            done,
        })
    }

    /// Name of the pumped stream, `stdout` or `stderr`.
    pub fn stream(&self) -> &'static str {
        self.stream
    }

    /// Wait up to `timeout` for the stream to reach EOF. Returns whether the thread finished.
    ///
    /// Emits no log events, so it is safe to call while the process is exiting.
    pub fn join_timeout(mut self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Err(RecvTimeoutError::Disconnected) | Ok(()) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_first_line_skips_blank_lines() {
        let (tx, rx) = mpsc::sync_channel(1);
        let input = Cursor::new(b"\n\r\n{\"port\":1234}\r\nlistening\n".to_vec());
        let pump = LinePump::spawn_with_first_line("stdout", input, tx).unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "{\"port\":1234}");
        assert!(pump.join_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let (tx, rx) = mpsc::sync_channel(1);
        let input = Cursor::new(vec![0xff, b'o', b'k', b'\n']);
        let pump = LinePump::spawn_with_first_line("stderr", input, tx).unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "\u{fffd}ok");
        assert!(pump.join_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_eof_without_lines_drops_sender() {
        let (tx, rx) = mpsc::sync_channel(1);
        let pump = LinePump::spawn_with_first_line("stdout", Cursor::new(Vec::new()), tx).unwrap();

        assert!(pump.join_timeout(Duration::from_secs(5)));
        assert!(rx.recv().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_join_times_out_while_writer_is_open() {
        let (reader, _writer) = std::os::unix::net::UnixStream::pair().unwrap();
        let pump = LinePump::spawn("stderr", reader).unwrap();
        assert!(!pump.join_timeout(Duration::from_millis(50)));
    }
}
