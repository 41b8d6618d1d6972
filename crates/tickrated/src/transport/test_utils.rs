//! Test helpers for the transport module.

use std::net::{SocketAddr, TcpStream};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use super::ConnectionSink;

/// Counts accepted connections and keeps the streams open.
pub(crate) struct CountingSink {
    count: Arc<AtomicUsize>,
    streams: Mutex<Vec<TcpStream>>,
}

impl CountingSink {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(Self {
            count: Arc::clone(&count),
            streams: Mutex::new(Vec::new()),
        });
        (count, sink)
    }
}

impl ConnectionSink for CountingSink {
    fn accept(&self, stream: TcpStream, _peer: SocketAddr) {
        self.streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(stream);
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
