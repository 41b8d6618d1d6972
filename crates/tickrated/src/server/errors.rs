//! Errors raised while starting or stopping the server.

use thiserror::Error;

use crate::tick::TickError;
use crate::transport::{ListenerError, PoolError};

/// Failures of the server's threads.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The tick engine could not be built, started, or joined.
    #[error("tick engine failed: {0}")]
    Tick(#[from] TickError),
    /// The listener could not be bound, started, or joined.
    #[error("listener failed: {0}")]
    Listener(#[from] ListenerError),
    /// The worker pool could not be started or joined.
    #[error("worker pool failed: {0}")]
    Pool(#[from] PoolError),
}
