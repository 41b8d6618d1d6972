//! Blocking wire client used to drive a running server.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use tickrate_wire::envelope::{self, HEARTBEAT_ACK_TYPE, SERVER_HEARTBEAT_ID};
use tickrate_wire::{FrameReader, WireMessage, encode, frame};

const READ_SLICE: Duration = Duration::from_millis(20);

/// One client connection with its own frame reassembly.
pub(crate) struct TestClient {
    stream: TcpStream,
    frames: FrameReader,
    received: VecDeque<String>,
    closed: bool,
}

impl TestClient {
    pub(crate) fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect to server");
        stream
            .set_read_timeout(Some(READ_SLICE))
            .expect("set client read timeout");
        Self {
            stream,
            frames: FrameReader::new(),
            received: VecDeque::new(),
            closed: false,
        }
    }

    pub(crate) fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).expect("write to server");
    }

    pub(crate) fn send(&mut self, message: &str) {
        self.send_raw(&frame(message));
    }

    pub(crate) fn send_command(&mut self, id: &str, name: &str) {
        self.send(&envelope::command_request(id, name, &WireMessage::new()));
    }

    pub(crate) fn acknowledge(&mut self) {
        let ack = WireMessage::new()
            .with_text("type", HEARTBEAT_ACK_TYPE)
            .with_text("id", "client-hb");
        self.send(&encode(&ack));
    }

    /// Reads whatever arrives within one read slice.
    fn pump(&mut self) {
        if self.closed {
            return;
        }
        let mut chunk = [0_u8; 4096];
        match self.stream.read(&mut chunk) {
            Ok(0) => self.closed = true,
            Ok(count) => {
                for body in self.frames.push(&chunk[..count]) {
                    self.received
                        .push_back(String::from_utf8(body).expect("utf-8 frame"));
                }
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) => {}
            Err(_) => self.closed = true,
        }
    }

    /// Next frame that is not a server heartbeat.
    pub(crate) fn next_reply(&mut self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        loop {
            while let Some(message) = self.received.pop_front() {
                if !is_heartbeat(&message) {
                    return Some(message);
                }
            }
            if self.closed || Instant::now() >= deadline {
                return None;
            }
            self.pump();
        }
    }

    /// Waits for a server heartbeat, discarding other frames.
    pub(crate) fn await_heartbeat(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            while let Some(message) = self.received.pop_front() {
                if is_heartbeat(&message) {
                    return true;
                }
            }
            if self.closed || Instant::now() >= deadline {
                return false;
            }
            self.pump();
        }
    }

    /// Sends acknowledgements for `duration`, draining incoming frames.
    pub(crate) fn keep_alive_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline && !self.closed {
            self.acknowledge();
            for _ in 0..10 {
                self.pump();
            }
            self.received.retain(|message| !is_heartbeat(message));
        }
    }

    /// Returns `true` once the server has closed the connection.
    pub(crate) fn wait_closed(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.closed && Instant::now() < deadline {
            self.pump();
        }
        self.closed
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }
}

fn is_heartbeat(message: &str) -> bool {
    message.contains(SERVER_HEARTBEAT_ID)
}
