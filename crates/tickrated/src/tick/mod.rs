//! Fixed-rate tick loop and the task queue it drains.
//!
//! [`TickEngine`] runs on its own thread. Every period it migrates newly
//! admitted work in the [`TaskScheduler`], runs at most one task, measures how
//! long that took, and sleeps out the remainder. Ticks are best effort: an
//! overrun is logged and the next tick starts immediately without catching
//! up.

mod engine;
mod errors;
mod metrics;
mod scheduler;
mod task;

pub use self::engine::{TickEngine, TickHandle, TickReport, TickThread};
pub use self::errors::TickError;
pub use self::metrics::{RATE_WINDOW, RateWindow, TickSnapshot, instantaneous_rate};
pub use self::scheduler::{RunOutcome, SchedulerStats, TaskScheduler};
pub use self::task::{Task, TaskId, TaskRun};

pub(crate) use self::task::panic_message;

pub(crate) const TICK_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::tick");
