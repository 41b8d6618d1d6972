//! Per-connection serving loop.
//!
//! A worker owns one connection for its whole life. Each iteration waits up to
//! the socket read timeout for data, processes every complete frame, and then
//! runs the heartbeat bookkeeping, so liveness checks happen at roughly the
//! poll cadence even when the client is silent.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tickrate_wire::FrameReader;
use tickrate_wire::envelope::{self, is_bare_heartbeat_ack, is_heartbeat_ack};
use tracing::{debug, info, warn};

use crate::dispatch::{CommandProcessor, ConnectionInfo};

use super::registry::{SlotHandle, SlotIndex};
use super::{FrameWriter, TRANSPORT_TARGET};

const READ_CHUNK: usize = 16 * 1024;

/// An accepted client together with the registry slot it occupies.
///
/// Dropping a connection closes the socket and frees the slot.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    slot: SlotHandle,
}

impl Connection {
    /// Pairs an accepted stream with its slot.
    #[must_use]
    pub fn new(stream: TcpStream, peer: SocketAddr, slot: SlotHandle) -> Self {
        Self { stream, peer, slot }
    }

    /// Remote address.
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Registry slot held by this connection.
    #[must_use]
    pub const fn slot(&self) -> SlotIndex {
        self.slot.index()
    }
}

/// Heartbeat cadence and liveness timeout for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatPolicy {
    /// Time between server heartbeats.
    pub interval: Duration,
    /// Silence after which a client that has not acknowledged is dropped.
    pub timeout: Duration,
}

/// Why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// The client closed its end.
    PeerClosed,
    /// No heartbeat acknowledgement arrived within the timeout.
    HeartbeatTimeout,
    /// The server is shutting down.
    ServerStopping,
    /// Reading from the socket failed.
    ReadFailed,
    /// Writing a reply or heartbeat failed.
    WriteFailed,
}

/// Serves connections handed out by the dispatch pool.
#[derive(Debug, Clone)]
pub struct ConnectionHandler {
    processor: Arc<CommandProcessor>,
    running: Arc<AtomicBool>,
    heartbeat: HeartbeatPolicy,
    writer: FrameWriter,
}

impl ConnectionHandler {
    /// Builds a handler that keeps serving while `running` stays `true`.
    #[must_use]
    pub fn new(
        processor: Arc<CommandProcessor>,
        running: Arc<AtomicBool>,
        heartbeat: HeartbeatPolicy,
    ) -> Self {
        let writer = FrameWriter::new(Arc::clone(&running));
        Self {
            processor,
            running,
            heartbeat,
            writer,
        }
    }

    /// Runs the read/process/heartbeat loop until the connection ends.
    ///
    /// The socket and slot are released when this returns, whatever the
    /// reason.
    pub fn serve(&self, connection: Connection) -> Disconnect {
        let Connection {
            mut stream,
            peer,
            slot,
        } = connection;
        let info = ConnectionInfo {
            slot: slot.index(),
            peer,
        };
        debug!(
            target: TRANSPORT_TARGET,
            %peer,
            slot = %info.slot,
            "serving connection"
        );

        let mut frames = FrameReader::new();
        let mut chunk = vec![0_u8; READ_CHUNK];
        let opened = Instant::now();
        let mut last_heartbeat = opened;
        let mut last_ack = opened;

        let reason = loop {
            if !self.running.load(Ordering::SeqCst) {
                break Disconnect::ServerStopping;
            }

            match stream.read(&mut chunk) {
                Ok(0) => break Disconnect::PeerClosed,
                Ok(count) => {
                    let complete = frames.push(chunk.get(..count).unwrap_or_default());
                    if let Err(reason) =
                        self.handle_frames(&mut stream, &complete, &info, &mut last_ack)
                    {
                        break reason;
                    }
                }
                Err(error) if is_idle(error.kind()) => {}
                Err(error) => {
                    debug!(
                        target: TRANSPORT_TARGET,
                        %peer,
                        %error,
                        "read failed"
                    );
                    break Disconnect::ReadFailed;
                }
            }

            if last_heartbeat.elapsed() >= self.heartbeat.interval {
                if let Err(error) = self.writer.send(&mut stream, &envelope::heartbeat()) {
                    debug!(
                        target: TRANSPORT_TARGET,
                        %peer,
                        %error,
                        "heartbeat write failed"
                    );
                    break Disconnect::WriteFailed;
                }
                last_heartbeat = Instant::now();
            }

            let silence = last_ack.elapsed();
            if silence > self.heartbeat.timeout {
                warn!(
                    target: TRANSPORT_TARGET,
                    %peer,
                    silence_ms = silence.as_millis(),
                    "heartbeat timeout; closing connection"
                );
                break Disconnect::HeartbeatTimeout;
            }
        };

        info!(
            target: TRANSPORT_TARGET,
            %peer,
            slot = %info.slot,
            ?reason,
            "connection closed"
        );
        reason
    }

    fn handle_frames(
        &self,
        stream: &mut TcpStream,
        frames: &[Vec<u8>],
        info: &ConnectionInfo,
        last_ack: &mut Instant,
    ) -> Result<(), Disconnect> {
        for frame in frames {
            let raw = String::from_utf8_lossy(frame);
            if is_heartbeat_ack(&raw) {
                *last_ack = Instant::now();
                if is_bare_heartbeat_ack(&raw) {
                    continue;
                }
            }
            let Some(reply) = self.processor.process(&raw, info) else {
                continue;
            };
            if let Err(error) = self.writer.send(stream, &reply) {
                debug!(
                    target: TRANSPORT_TARGET,
                    peer = %info.peer,
                    %error,
                    "reply write failed"
                );
                return Err(Disconnect::WriteFailed);
            }
        }
        Ok(())
    }
}

/// Read outcomes meaning "nothing arrived within the poll interval".
fn is_idle(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
