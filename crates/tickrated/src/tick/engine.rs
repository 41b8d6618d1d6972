//! Fixed-rate scheduling loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::latch::Latch;

use super::TICK_TARGET;
use super::errors::TickError;
use super::metrics::{RateWindow, TickSnapshot, instantaneous_rate};
use super::scheduler::{RunOutcome, TaskScheduler};

#[derive(Debug)]
struct Shared {
    running: AtomicBool,
    snapshot: Mutex<TickSnapshot>,
    scheduler: Arc<TaskScheduler>,
}

/// Cloneable view of a tick engine used to stop it and read its metrics.
#[derive(Debug, Clone)]
pub struct TickHandle {
    shared: Arc<Shared>,
}

impl TickHandle {
    /// Stops the loop and wakes the tick thread if it is waiting for work.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.scheduler.close();
    }

    /// Returns `true` while the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Figures published by the most recent tick.
    #[must_use]
    pub fn snapshot(&self) -> TickSnapshot {
        *self
            .shared
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// What one call to [`TickEngine::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Metrics published for the tick.
    pub snapshot: TickSnapshot,
    /// Result of the run step.
    pub outcome: RunOutcome,
}

/// Drives a [`TaskScheduler`] at a fixed target rate.
#[derive(Debug)]
pub struct TickEngine {
    target_rate: f64,
    period: Duration,
    monitor_interval: u64,
    window: RateWindow,
    tick_count: u64,
    shared: Arc<Shared>,
}

impl TickEngine {
    /// Builds an engine for `target_rate` hertz.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::InvalidRate`] unless the rate is positive and
    /// finite.
    pub fn new(target_rate: f64, scheduler: Arc<TaskScheduler>) -> Result<Self, TickError> {
        if !target_rate.is_finite() || target_rate <= 0.0 {
            return Err(TickError::InvalidRate { rate: target_rate });
        }
        let period = Duration::try_from_secs_f64(target_rate.recip())
            .map_err(|_| TickError::InvalidRate { rate: target_rate })?;
        let snapshot = TickSnapshot {
            target_rate,
            ..TickSnapshot::default()
        };
        Ok(Self {
            target_rate,
            period,
            monitor_interval: 0,
            window: RateWindow::new(),
            tick_count: 0,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                snapshot: Mutex::new(snapshot),
                scheduler,
            }),
        })
    }

    /// Logs a summary every `interval` ticks; zero disables the summary.
    #[must_use]
    pub fn with_monitor_interval(mut self, interval: u64) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Duration of one tick.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Returns a handle sharing this engine's run state and metrics.
    #[must_use]
    pub fn handle(&self) -> TickHandle {
        TickHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Spawns the tick thread. `ready` is set once the thread is running.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Spawn`] when the thread cannot be created.
    pub fn start(mut self, ready: Latch) -> Result<TickThread, TickError> {
        let handle = self.handle();
        self.shared.running.store(true, Ordering::SeqCst);
        let join = thread::Builder::new()
            .name(String::from("tick"))
            .spawn(move || {
                ready.set();
                self.run();
            })
            .map_err(|source| {
                handle.shared.running.store(false, Ordering::SeqCst);
                TickError::Spawn { source }
            })?;
        Ok(TickThread {
            handle,
            join: Some(join),
        })
    }

    /// Runs ticks until the handle is stopped.
    pub fn run(&mut self) {
        info!(
            target: TICK_TARGET,
            target_rate = self.target_rate,
            period_us = self.period.as_micros(),
            "tick engine started"
        );
        while self.shared.running.load(Ordering::SeqCst) {
            let started = Instant::now();
            let report = self.tick();
            self.pace(started, &report);
        }
        info!(
            target: TICK_TARGET,
            ticks = self.tick_count,
            "tick engine stopped"
        );
    }

    /// Performs the work of one tick without sleeping.
    ///
    /// Migrates admitted work, runs at most one task (waiting for the rest of
    /// the period if none is ready), then updates and publishes metrics.
    pub fn tick(&mut self) -> TickReport {
        let started = Instant::now();
        let scheduler = &self.shared.scheduler;
        scheduler.drain_and_migrate(self.tick_count);
        let outcome = scheduler.run_next(started + self.period);
        let elapsed = started.elapsed();

        let current_rate = instantaneous_rate(elapsed).unwrap_or_else(|| {
            warn!(
                target: TICK_TARGET,
                tick = self.tick_count,
                "non-positive tick duration; using target rate"
            );
            self.target_rate
        });
        let average_rate = self.window.record(current_rate);
        self.tick_count += 1;

        let snapshot = TickSnapshot {
            tick_count: self.tick_count,
            current_rate,
            average_rate,
            elapsed,
            target_rate: self.target_rate,
        };
        *self
            .shared
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;

        if self.monitor_interval > 0 && self.tick_count % self.monitor_interval == 0 {
            let stats = scheduler.stats();
            info!(
                target: TICK_TARGET,
                tick = self.tick_count,
                current_rate,
                average_rate,
                active = stats.active,
                "Tick {}: Real={:.2}Hz, Avg={:.2}Hz, Tasks={}",
                self.tick_count,
                current_rate,
                average_rate,
                stats.active
            );
        }

        TickReport { snapshot, outcome }
    }

    /// Sleeps out the rest of the period for ticks that ran work.
    ///
    /// Idle ticks already waited until the deadline inside the scheduler.
    fn pace(&self, started: Instant, report: &TickReport) {
        if matches!(report.outcome, RunOutcome::Idle) {
            return;
        }
        let deadline = started + self.period;
        let now = Instant::now();
        if now >= deadline {
            if matches!(report.outcome, RunOutcome::Ran(_)) {
                warn!(
                    target: TICK_TARGET,
                    tick = report.snapshot.tick_count,
                    lag_us = now.duration_since(deadline).as_micros(),
                    "tick overran its period"
                );
            }
            return;
        }
        sleep_until(deadline);
    }
}

/// Sleeps until `deadline`, resuming after early wake-ups.
fn sleep_until(deadline: Instant) {
    loop {
        let now = Instant::now();
        let Some(remaining) = deadline.checked_duration_since(now) else {
            return;
        };
        if remaining.is_zero() {
            return;
        }
        thread::sleep(remaining);
        if Instant::now() < deadline {
            debug!(
                target: TICK_TARGET,
                "tick sleep woke early; resuming"
            );
        }
    }
}

/// Handle to the running tick thread.
#[derive(Debug)]
pub struct TickThread {
    handle: TickHandle,
    join: Option<thread::JoinHandle<()>>,
}

impl TickThread {
    /// Shared view of the running engine.
    #[must_use]
    pub fn handle(&self) -> &TickHandle {
        &self.handle
    }

    /// Requests the loop to stop.
    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Waits for the tick thread to finish.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::ThreadPanic`] when the thread panicked.
    pub fn join(mut self) -> Result<(), TickError> {
        match self.join.take() {
            Some(join) => join.join().map_err(|_| TickError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for TickThread {
    fn drop(&mut self) {
        self.handle.stop();
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::tick::task::Task;

    #[fixture]
    fn scheduler() -> Arc<TaskScheduler> {
        Arc::new(TaskScheduler::new())
    }

    #[rstest]
    #[case(0.0)]
    #[case(-5.0)]
    #[case(f64::NAN)]
    fn rejects_unusable_rates(scheduler: Arc<TaskScheduler>, #[case] rate: f64) {
        assert!(matches!(
            TickEngine::new(rate, scheduler),
            Err(TickError::InvalidRate { .. })
        ));
    }

    #[rstest]
    fn period_is_reciprocal_of_rate(scheduler: Arc<TaskScheduler>) {
        let engine = TickEngine::new(50.0, scheduler).expect("engine");
        assert_eq!(engine.period(), Duration::from_millis(20));
    }

    #[rstest]
    fn idle_tick_waits_out_the_period(scheduler: Arc<TaskScheduler>) {
        let mut engine = TickEngine::new(50.0, scheduler).expect("engine");
        let report = engine.tick();
        assert_eq!(report.outcome, RunOutcome::Idle);
        assert!(report.snapshot.elapsed >= Duration::from_millis(20));
        assert_eq!(report.snapshot.tick_count, 1);
    }

    #[rstest]
    fn n_tasks_finish_in_n_ticks(scheduler: Arc<TaskScheduler>) {
        for index in 0..5 {
            scheduler.admit(Task::new(format!("task-{index}"), || {}));
        }
        let mut engine = TickEngine::new(200.0, Arc::clone(&scheduler)).expect("engine");

        for _ in 0..5 {
            assert!(matches!(engine.tick().outcome, RunOutcome::Ran(_)));
        }

        let stats = scheduler.stats();
        assert_eq!(stats.total_processed, 5);
        assert_eq!(stats.pending + stats.active, 0);
    }

    #[rstest]
    fn snapshot_is_published_to_handles(scheduler: Arc<TaskScheduler>) {
        let mut engine = TickEngine::new(100.0, scheduler).expect("engine");
        let handle = engine.handle();
        let report = engine.tick();
        assert_eq!(handle.snapshot(), report.snapshot);
        assert!(handle.snapshot().average_rate > 0.0);
    }

    #[rstest]
    fn started_engine_signals_ready_and_stops_promptly(scheduler: Arc<TaskScheduler>) {
        let engine = TickEngine::new(10.0, Arc::clone(&scheduler)).expect("engine");
        let ready = Latch::new();
        let thread = engine.start(ready.clone()).expect("start");
        assert!(ready.wait_timeout(Duration::from_secs(2)));
        assert!(thread.handle().is_running());

        scheduler.admit(Task::new("one", || {}));
        let deadline = Instant::now() + Duration::from_secs(2);
        while scheduler.stats().total_processed == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(scheduler.stats().total_processed, 1);

        let stopping = Instant::now();
        thread.stop();
        thread.join().expect("join tick thread");
        assert!(stopping.elapsed() < Duration::from_secs(1));
    }
}
