//! Fixed-rate tick server.
//!
//! The daemon runs three kinds of threads. One tick thread drives a
//! [`TickEngine`] at the configured rate, draining a [`TaskScheduler`] one
//! task per tick. One listener thread accepts TCP connections, claims a slot
//! for each in a bounded [`ConnectionRegistry`], and hands it to the
//! [`DispatchQueue`]. A fixed pool of workers takes the most recently queued
//! connection and serves it to completion: framing requests on the `0x1E`
//! delimiter, routing commands through the [`CommandRegistry`], and probing
//! the client with heartbeats until it disconnects or goes silent.
//!
//! Startup is a fixed sequence:
//! configuration is loaded and validated, telemetry is installed, the
//! [`Server`] is started, and the process waits for a termination signal or a
//! `stop_server` command before shutting every thread down in order. Health
//! reporting hooks emit structured events at each stage.

mod bootstrap;
mod dispatch;
mod health;
mod latch;
mod process;
mod server;
mod telemetry;
mod tick;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{
    AddTask, CommandFailure, CommandHandler, CommandOutput, CommandProcessor, CommandRegistry,
    ConnectionInfo, DispatchError, GetServerStatus, Ping, StopServer, register_builtins,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use latch::Latch;
pub use process::{
    LaunchError, ShutdownCause, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon,
};
pub use server::{RunningServer, Server, ServerError};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use tick::{
    RATE_WINDOW, RateWindow, RunOutcome, SchedulerStats, Task, TaskId, TaskRun, TaskScheduler,
    TickEngine, TickError, TickHandle, TickReport, TickSnapshot, TickThread, instantaneous_rate,
};
pub use transport::{
    Connection, ConnectionHandler, ConnectionRegistry, ConnectionSink, Disconnect, DispatchQueue,
    HeartbeatPolicy, Listener, ListenerError, ListenerHandle, PoolError, RegistryError, SlotHandle,
    SlotIndex, SlotRecord, StreamOptions,
};

#[cfg(test)]
mod tests;
