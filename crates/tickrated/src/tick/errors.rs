//! Error types for the tick engine.

use std::io;

use thiserror::Error;

/// Errors surfaced while configuring or running the tick engine.
#[derive(Debug, Error)]
pub enum TickError {
    /// The target rate is zero, negative, or not finite.
    #[error("tick rate must be a positive finite number of hertz, got {rate}")]
    InvalidRate {
        /// Rejected rate.
        rate: f64,
    },
    /// The tick thread could not be spawned.
    #[error("failed to spawn tick thread: {source}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The tick thread did not report readiness in time.
    #[error("tick thread did not start within {timeout_ms} ms")]
    NotReady {
        /// Time waited, in milliseconds.
        timeout_ms: u128,
    },
    /// The tick thread panicked.
    #[error("tick thread panicked")]
    ThreadPanic,
}
