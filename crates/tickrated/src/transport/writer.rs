//! Outbound frame writer.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tickrate_wire::frame;

const WRITE_BACKOFF: Duration = Duration::from_millis(10);

/// Writes delimited frames, retrying transient failures while the server
/// runs.
#[derive(Debug, Clone)]
pub(crate) struct FrameWriter {
    running: Arc<AtomicBool>,
}

impl FrameWriter {
    pub(crate) fn new(running: Arc<AtomicBool>) -> Self {
        Self { running }
    }

    /// Writes `message` plus the delimiter in full.
    ///
    /// `WouldBlock`, `TimedOut` and `Interrupted` are retried after a short
    /// sleep until the frame is complete or the server stops. Any other error
    /// is returned and the connection should be dropped.
    pub(crate) fn send<W: Write>(&self, sink: &mut W, message: &str) -> io::Result<()> {
        let bytes = frame(message);
        let mut written = 0;
        while let Some(remaining) = bytes.get(written..)
            && !remaining.is_empty()
        {
            match sink.write(remaining) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "peer stopped accepting data",
                    ));
                }
                Ok(count) => written += count,
                Err(error) if is_transient(error.kind()) => {
                    if !self.running.load(Ordering::SeqCst) {
                        return Err(error);
                    }
                    thread::sleep(WRITE_BACKOFF);
                }
                Err(error) => return Err(error),
            }
        }
        sink.flush()
    }
}

fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
