//! Error types for the listener, slot registry, and worker pool.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while binding or running the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured host did not resolve.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no address.
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Creating or configuring the listening socket failed.
    #[error("failed to create listening socket for {addr}: {source}")]
    Socket {
        /// Address being bound.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Binding the address failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    Bind {
        /// Address being bound.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Listening on the bound socket failed.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        /// Bound address.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener to non-blocking mode failed.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be spawned.
    #[error("failed to spawn listener thread: {source}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}

/// Errors reported by the connection slot registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Every slot is held by a live connection.
    #[error("all {capacity} connection slots are in use")]
    Exhausted {
        /// Registry capacity.
        capacity: usize,
    },
}

/// Errors reported by the dispatch worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A worker thread could not be spawned.
    #[error("failed to spawn dispatch worker {index}: {source}")]
    Spawn {
        /// Zero-based worker number.
        index: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The queue already holds its capacity of connections.
    #[error("dispatch queue is full ({capacity} connections waiting)")]
    QueueFull {
        /// Queue capacity.
        capacity: usize,
    },
    /// The pool has been shut down.
    #[error("dispatch pool is shut down")]
    Stopped,
    /// One or more workers panicked.
    #[error("{count} dispatch worker(s) panicked")]
    WorkerPanic {
        /// Number of workers whose join failed.
        count: usize,
    },
}
