//! Admission queue drained by the tick thread.
//!
//! Tasks move through up to three collections: `pending` receives admissions
//! from any thread, `scheduled` holds tasks waiting for a future tick, and
//! `active` holds tasks ready to run. Each tick migrates pending and due work
//! onto `active` under one lock, then runs the head of `active` with the lock
//! released. Migration keeps arrival order (FIFO).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::warn;

use super::TICK_TARGET;
use super::task::{Task, TaskId, TaskRun};

/// Outcome of [`TaskScheduler::run_next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A task was taken off `active` and executed.
    Ran(TaskRun),
    /// No work arrived before the deadline.
    Idle,
    /// The scheduler has been closed.
    Closed,
}

/// Point-in-time view of the scheduler's queues and counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Admitted tasks not yet migrated.
    pub pending: usize,
    /// Delayed tasks whose due tick has not been reached.
    pub scheduled: usize,
    /// Tasks ready to run.
    pub active: usize,
    /// Tasks taken off `active` and run, whatever the outcome.
    pub total_processed: u64,
    /// Tasks whose work panicked.
    pub total_failed: u64,
}

#[derive(Debug)]
struct Scheduled {
    due: u64,
    task: Task,
}

#[derive(Debug, Default)]
struct Queues {
    pending: Vec<Task>,
    scheduled: Vec<Scheduled>,
    active: VecDeque<Task>,
    current_tick: u64,
    total_active: usize,
    total_processed: u64,
    total_failed: u64,
    closed: bool,
}

impl Queues {
    fn migrate(&mut self) -> usize {
        let mut moved = self.pending.len();
        self.active.extend(self.pending.drain(..));

        if !self.scheduled.is_empty() {
            let now = self.current_tick;
            let mut waiting = Vec::with_capacity(self.scheduled.len());
            for entry in self.scheduled.drain(..) {
                if entry.due <= now {
                    self.active.push_back(entry.task);
                    moved += 1;
                } else {
                    waiting.push(entry);
                }
            }
            self.scheduled = waiting;
        }

        self.total_active += moved;
        moved
    }

    fn take_next(&mut self) -> Option<Task> {
        let task = self.active.pop_front()?;
        self.total_active = self.total_active.saturating_sub(1);
        Some(task)
    }
}

/// Two-stage task queue shared between producers and the tick thread.
#[derive(Debug, Default)]
pub struct TaskScheduler {
    queues: Mutex<Queues>,
    work_ready: Condvar,
    next_id: AtomicU64,
}

impl TaskScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn assign_id(&self, task: &mut Task) -> TaskId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        task.assign_id(id);
        id
    }

    /// Queues `task` for the next tick and wakes the tick thread.
    ///
    /// Callable from any thread; never blocks beyond the queue lock.
    pub fn admit(&self, mut task: Task) -> TaskId {
        let id = self.assign_id(&mut task);
        self.lock().pending.push(task);
        self.work_ready.notify_one();
        id
    }

    /// Queues `task` to become runnable `delay_ticks` after the current tick.
    ///
    /// A delay of zero is equivalent to [`TaskScheduler::admit`].
    pub fn schedule(&self, mut task: Task, delay_ticks: u64) -> TaskId {
        if delay_ticks == 0 {
            return self.admit(task);
        }
        let id = self.assign_id(&mut task);
        {
            let mut queues = self.lock();
            let due = queues.current_tick.saturating_add(delay_ticks);
            queues.scheduled.push(Scheduled { due, task });
        }
        self.work_ready.notify_one();
        id
    }

    /// Records `current_tick` and moves pending and due tasks onto `active`.
    ///
    /// Returns the number of tasks moved.
    pub fn drain_and_migrate(&self, current_tick: u64) -> usize {
        let mut queues = self.lock();
        queues.current_tick = current_tick;
        queues.migrate()
    }

    /// Runs the head of `active`, waiting until `deadline` for work to arrive.
    ///
    /// Admissions made during the wait are migrated and run in the same call.
    /// The lock is released while the task runs.
    pub fn run_next(&self, deadline: Instant) -> RunOutcome {
        let mut queues = self.lock();
        let task = loop {
            queues.migrate();
            if let Some(task) = queues.take_next() {
                break task;
            }
            if queues.closed {
                return RunOutcome::Closed;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return RunOutcome::Idle;
            };
            if remaining.is_zero() {
                return RunOutcome::Idle;
            }
            queues = self
                .work_ready
                .wait_timeout(queues, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        };
        drop(queues);

        let outcome = task.run();

        let mut queues = self.lock();
        queues.total_processed += 1;
        if let Some(message) = &outcome.failure {
            queues.total_failed += 1;
            warn!(
                target: TICK_TARGET,
                task_id = outcome.id,
                task = %outcome.name,
                panic = %message,
                "task panicked"
            );
        }
        RunOutcome::Ran(outcome)
    }

    /// Stops accepting waits: blocked and future [`TaskScheduler::run_next`]
    /// calls return [`RunOutcome::Closed`] once `active` is empty.
    pub fn close(&self) {
        self.lock().closed = true;
        self.work_ready.notify_all();
    }

    /// Returns `true` once [`TaskScheduler::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Captures queue lengths and counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let queues = self.lock();
        SchedulerStats {
            pending: queues.pending.len(),
            scheduled: queues.scheduled.len(),
            active: queues.total_active,
            total_processed: queues.total_processed,
            total_failed: queues.total_failed,
        }
    }
}
