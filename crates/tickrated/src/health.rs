//! Structured health reporting for daemon lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use tickrate_config::Config;

use crate::bootstrap::BootstrapError;
use crate::process::ShutdownCause;
use crate::server::ServerError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once every server thread is running.
    fn server_ready(&self, addr: SocketAddr);

    /// Invoked when a shutdown begins.
    fn server_stopping(&self, cause: ShutdownCause);

    /// Invoked after every server thread has been joined, with the first
    /// join failure if any.
    fn server_stopped(&self, error: Option<&ServerError>);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn server_ready(&self, addr: SocketAddr) {
        (**self).server_ready(addr);
    }

    fn server_stopping(&self, cause: ShutdownCause) {
        (**self).server_stopping(cause);
    }

    fn server_stopped(&self, error: Option<&ServerError>) {
        (**self).server_stopped(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            listen_host = %config.listen_host,
            listen_port = config.listen_port,
            tick_rate_hz = config.tick_rate_hz,
            max_clients = config.max_clients,
            workers = config.worker_count,
            heartbeat_secs = config.heartbeat_interval_secs,
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn server_ready(&self, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_ready",
            %addr,
            "server accepting connections"
        );
    }

    fn server_stopping(&self, cause: ShutdownCause) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopping",
            ?cause,
            "server shutting down"
        );
    }

    fn server_stopped(&self, error: Option<&ServerError>) {
        match error {
            None => tracing::info!(
                target: HEALTH_TARGET,
                event = "server_stopped",
                "server threads joined"
            ),
            Some(error) => tracing::error!(
                target: HEALTH_TARGET,
                event = "server_stopped",
                %error,
                "server shut down uncleanly"
            ),
        }
    }
}
