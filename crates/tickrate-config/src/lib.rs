//! Layered configuration for the tickrate daemon.
//!
//! [`Config`] merges built-in defaults, an optional TOML configuration file,
//! `TICKRATE_*` environment variables, and command-line flags, in increasing
//! order of precedence. Loading only resolves values; [`Config::validate`]
//! checks that they describe a runnable server and is called by the daemon
//! before anything is started.

mod defaults;
mod logging;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_BACKLOG, DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_HEARTBEAT_TIMEOUT_SECS,
    DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT, DEFAULT_LOG_FILTER, DEFAULT_MAX_CLIENTS,
    DEFAULT_MONITOR_INTERVAL_TICKS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_TICK_RATE_HZ, DEFAULT_WORKER_COUNT, default_listen_host, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TICKRATE")]
pub struct Config {
    /// Interface the listener binds.
    #[ortho_config(default = defaults::default_listen_host())]
    pub listen_host: String,
    /// TCP port the listener binds.
    #[ortho_config(default = DEFAULT_LISTEN_PORT)]
    pub listen_port: u16,
    /// Listen backlog.
    #[ortho_config(default = DEFAULT_BACKLOG)]
    pub backlog: u32,
    /// Target tick rate in hertz.
    #[ortho_config(default = DEFAULT_TICK_RATE_HZ)]
    pub tick_rate_hz: f64,
    /// Emit a tick summary every this many ticks; zero disables it.
    #[ortho_config(default = DEFAULT_MONITOR_INTERVAL_TICKS)]
    pub monitor_interval_ticks: u64,
    /// Capacity of the connection slot pool.
    #[ortho_config(default = DEFAULT_MAX_CLIENTS)]
    pub max_clients: usize,
    /// Number of dispatch worker threads.
    #[ortho_config(default = DEFAULT_WORKER_COUNT)]
    pub worker_count: usize,
    /// Capacity of the dispatch queue.
    #[ortho_config(default = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
    /// Seconds between heartbeats.
    #[ortho_config(default = DEFAULT_HEARTBEAT_INTERVAL_SECS)]
    pub heartbeat_interval_secs: u64,
    /// Seconds without a heartbeat acknowledgement before a client is dropped.
    #[ortho_config(default = DEFAULT_HEARTBEAT_TIMEOUT_SECS)]
    pub heartbeat_timeout_secs: u64,
    /// Longest single wait for socket readability, in milliseconds.
    #[ortho_config(default = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
    /// Tracing filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            listen_port: DEFAULT_LISTEN_PORT,
            backlog: DEFAULT_BACKLOG,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            monitor_interval_ticks: DEFAULT_MONITOR_INTERVAL_TICKS,
            max_clients: DEFAULT_MAX_CLIENTS,
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            heartbeat_timeout_secs: DEFAULT_HEARTBEAT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

/// Capacities of the connection-serving machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerLimits {
    /// Connection slots.
    pub max_clients: usize,
    /// Dispatch worker threads.
    pub worker_count: usize,
    /// Dispatch queue capacity.
    pub queue_capacity: usize,
}

/// Reasons a loaded configuration cannot run a server.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The tick rate is zero, negative, or not finite.
    #[error("tick rate must be a positive finite number of hertz, got {rate}")]
    InvalidTickRate {
        /// Offending rate.
        rate: f64,
    },
    /// A capacity or thread count is zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The heartbeat timeout would expire before the next heartbeat.
    #[error(
        "heartbeat timeout ({timeout_secs}s) must exceed the heartbeat interval ({interval_secs}s)"
    )]
    HeartbeatWindow {
        /// Configured interval.
        interval_secs: u64,
        /// Configured timeout.
        timeout_secs: u64,
    },
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns the loader error when any layer fails to parse.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the program name.
    ///
    /// # Errors
    ///
    /// Returns the loader error when any layer fails to parse.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Checks that the values describe a runnable server.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 {
            return Err(ConfigError::InvalidTickRate {
                rate: self.tick_rate_hz,
            });
        }
        let counts = [
            ("max_clients", self.max_clients),
            ("worker_count", self.worker_count),
            ("queue_capacity", self.queue_capacity),
        ];
        if let Some((field, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero { field });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Zero {
                field: "poll_interval_ms",
            });
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Zero {
                field: "heartbeat_interval_secs",
            });
        }
        if self.heartbeat_timeout_secs <= self.heartbeat_interval_secs {
            return Err(ConfigError::HeartbeatWindow {
                interval_secs: self.heartbeat_interval_secs,
                timeout_secs: self.heartbeat_timeout_secs,
            });
        }
        Ok(())
    }

    /// Interface and port the listener binds.
    #[must_use]
    pub fn listen_addr(&self) -> (&str, u16) {
        (self.listen_host.as_str(), self.listen_port)
    }

    /// Duration of one tick at the target rate.
    ///
    /// Only meaningful after [`Config::validate`] has succeeded.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        Duration::try_from_secs_f64(self.tick_rate_hz.recip()).unwrap_or(Duration::ZERO)
    }

    /// Cadence of server heartbeats.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Silence after which a client is dropped.
    #[must_use]
    pub const fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Longest single wait for socket readability.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Capacities of the slot pool and worker pool.
    #[must_use]
    pub const fn limits(&self) -> ServerLimits {
        ServerLimits {
            max_clients: self.max_clients,
            worker_count: self.worker_count,
            queue_capacity: self.queue_capacity,
        }
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
