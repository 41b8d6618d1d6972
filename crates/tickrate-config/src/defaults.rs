//! Built-in defaults applied when no layer supplies a value.

use crate::logging::LogFormat;

/// Interface the listener binds when none is configured.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

/// TCP port clients connect to.
pub const DEFAULT_LISTEN_PORT: u16 = 27016;

/// Pending-connection backlog requested from the kernel.
pub const DEFAULT_BACKLOG: u32 = 3;

/// Target tick rate in hertz.
pub const DEFAULT_TICK_RATE_HZ: f64 = 128.0;

/// Tick summary cadence; zero disables the monitor.
pub const DEFAULT_MONITOR_INTERVAL_TICKS: u64 = 0;

/// Number of connection slots.
pub const DEFAULT_MAX_CLIENTS: usize = 32;

/// Number of dispatch worker threads.
pub const DEFAULT_WORKER_COUNT: usize = 8;

/// Maximum number of accepted connections waiting for a worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Seconds between heartbeats sent to each client.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 5;

/// Seconds without an acknowledgement before a client is dropped.
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 30;

/// Upper bound on a single readability wait, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned listen host, for serde and derive defaults.
#[must_use]
pub fn default_listen_host() -> String {
    DEFAULT_LISTEN_HOST.to_owned()
}

/// Default log filter expression used by the daemon.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the daemon.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
