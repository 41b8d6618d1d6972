//! Bounded worker pool serving accepted connections.
//!
//! Submitted jobs go onto a bounded stack and idle workers always take the
//! most recently submitted one. Under load this favours freshly accepted
//! connections over ones that have already waited. Submissions beyond the
//! capacity are rejected immediately and the job is dropped, which for a
//! connection closes its socket and releases its slot.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::tick::panic_message;

use super::TRANSPORT_TARGET;
use super::errors::PoolError;

type Runner<J> = Arc<dyn Fn(J) + Send + Sync + 'static>;

struct State<J> {
    stack: Vec<J>,
    running: bool,
}

struct Shared<J> {
    state: Mutex<State<J>>,
    available: Condvar,
    capacity: usize,
}

impl<J> Shared<J> {
    fn lock(&self) -> MutexGuard<'_, State<J>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop(&self) -> Vec<J> {
        let leftovers = {
            let mut state = self.lock();
            state.running = false;
            std::mem::take(&mut state.stack)
        };
        self.available.notify_all();
        leftovers
    }
}

/// Fixed set of worker threads fed from a bounded last-in-first-out stack.
pub struct DispatchQueue<J> {
    shared: Arc<Shared<J>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<J> DispatchQueue<J>
where
    J: Send + 'static,
{
    /// Spawns `worker_count` workers that pass each job to `run`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] if a worker thread cannot be created; any
    /// workers already started are stopped and joined first.
    pub fn start<F>(worker_count: usize, capacity: usize, run: F) -> Result<Self, PoolError>
    where
        F: Fn(J) + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                stack: Vec::with_capacity(capacity),
                running: true,
            }),
            available: Condvar::new(),
            capacity,
        });
        let runner: Runner<J> = Arc::new(run);
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let worker_shared = Arc::clone(&shared);
            let worker_runner = Arc::clone(&runner);
            let spawned = thread::Builder::new()
                .name(format!("dispatch-{index}"))
                .spawn(move || worker_loop(index, &worker_shared, &worker_runner));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    drop(shared.stop());
                    for handle in workers {
                        let _joined = handle.join();
                    }
                    return Err(PoolError::Spawn { index, source });
                }
            }
        }
        Ok(Self {
            shared,
            workers: Mutex::new(workers),
        })
    }

    /// Queues `job` and wakes one worker.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::QueueFull`] when the stack is at capacity and
    /// [`PoolError::Stopped`] after shutdown. In both cases `job` is dropped
    /// before returning.
    pub fn submit(&self, job: J) -> Result<(), PoolError> {
        let rejected = {
            let mut state = self.shared.lock();
            if !state.running {
                Some((job, PoolError::Stopped))
            } else if state.stack.len() >= self.shared.capacity {
                Some((
                    job,
                    PoolError::QueueFull {
                        capacity: self.shared.capacity,
                    },
                ))
            } else {
                state.stack.push(job);
                None
            }
        };
        match rejected {
            Some((job, error)) => {
                drop(job);
                Err(error)
            }
            None => {
                self.shared.available.notify_one();
                Ok(())
            }
        }
    }

    /// Number of jobs waiting for a worker.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.lock().stack.len()
    }

    /// Maximum number of waiting jobs.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Stops the pool, drops waiting jobs, and joins every worker.
    ///
    /// Workers finish the job they are running before exiting.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::WorkerPanic`] if any worker thread panicked.
    pub fn shutdown(&self) -> Result<(), PoolError> {
        let leftovers = self.shared.stop();
        if !leftovers.is_empty() {
            debug!(
                target: TRANSPORT_TARGET,
                dropped = leftovers.len(),
                "discarding queued connections at shutdown"
            );
        }
        drop(leftovers);

        let workers = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let panicked = workers
            .into_iter()
            .map(JoinHandle::join)
            .filter(Result::is_err)
            .count();
        if panicked > 0 {
            return Err(PoolError::WorkerPanic { count: panicked });
        }
        Ok(())
    }
}

impl<J> fmt::Debug for DispatchQueue<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("capacity", &self.shared.capacity)
            .finish_non_exhaustive()
    }
}

impl<J> Drop for DispatchQueue<J> {
    fn drop(&mut self) {
        drop(self.shared.stop());
    }
}

fn worker_loop<J>(index: usize, shared: &Shared<J>, run: &Runner<J>) {
    loop {
        let job = {
            let mut state = shared.lock();
            loop {
                if !state.running {
                    return;
                }
                if let Some(job) = state.stack.pop() {
                    break job;
                }
                state = shared
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| run(job))) {
            warn!(
                target: TRANSPORT_TARGET,
                worker = index,
                panic = %panic_message(payload.as_ref()),
                "dispatch job panicked"
            );
        }
    }
}
