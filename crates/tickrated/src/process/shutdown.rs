use std::io;
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use crate::latch::Latch;

use super::PROCESS_TARGET;

/// What ended the server's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// A termination signal arrived.
    Signal(i32),
    /// A client invoked `stop_server`.
    StopRequested,
}

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until a termination signal arrives or `stop` is set.
    fn wait(&self, stop: &Latch) -> Result<ShutdownCause, ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The signal watcher thread could not be spawned.
    #[error("failed to spawn signal watcher: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The signal watcher thread panicked.
    #[error("signal watcher thread panicked")]
    ThreadPanic,
}

/// Shutdown listener that waits for SIGTERM, SIGINT, SIGQUIT, or SIGHUP.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    /// Builds a signal listener.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self, stop: &Latch) -> Result<ShutdownCause, ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        let watcher_stop = stop.clone();
        let watcher = thread::Builder::new()
            .name(String::from("signals"))
            .spawn(move || {
                let signal = signals.forever().next();
                if signal.is_some() {
                    watcher_stop.set();
                }
                signal
            })
            .map_err(|source| ShutdownError::Spawn { source })?;

        stop.wait();
        handle.close();
        let signal = watcher.join().map_err(|_| ShutdownError::ThreadPanic)?;
        let cause = signal.map_or(ShutdownCause::StopRequested, ShutdownCause::Signal);
        info!(
            target: PROCESS_TARGET,
            ?cause,
            "shutdown requested"
        );
        Ok(cause)
    }
}
