//! Hand-off from the accept loop to the worker pool.

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use tracing::warn;

use crate::transport::{
    Connection, ConnectionRegistry, ConnectionSink, DispatchQueue, TRANSPORT_TARGET,
};

/// Claims a slot for each accepted stream and queues it for a worker.
///
/// Either step failing drops the stream, which closes the socket, and drops
/// any slot already taken.
pub(crate) struct Admission {
    connections: ConnectionRegistry,
    pool: Arc<DispatchQueue<Connection>>,
}

impl Admission {
    pub(crate) fn new(
        connections: ConnectionRegistry,
        pool: Arc<DispatchQueue<Connection>>,
    ) -> Self {
        Self { connections, pool }
    }
}

impl ConnectionSink for Admission {
    fn accept(&self, stream: TcpStream, peer: SocketAddr) {
        let slot = match self.connections.allocate(peer) {
            Ok(slot) => slot,
            Err(error) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    %peer,
                    %error,
                    "rejecting connection"
                );
                return;
            }
        };
        if let Err(error) = self.pool.submit(Connection::new(stream, peer, slot)) {
            warn!(
                target: TRANSPORT_TARGET,
                %peer,
                %error,
                "rejecting connection"
            );
        }
    }
}
