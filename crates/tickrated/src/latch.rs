//! One-shot signals shared between threads.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A flag that is set once and can be awaited from any thread.
///
/// Clones share state. The server owns one latch to confirm that the tick
/// thread is running and another to carry stop requests from commands to the
/// process supervisor.
#[derive(Debug, Clone, Default)]
pub struct Latch {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Latch {
    /// Creates an unset latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the latch and wakes every waiter. Later calls have no effect.
    pub fn set(&self) {
        *self.lock() = true;
        self.inner.1.notify_all();
    }

    /// Returns `true` once the latch has been set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Blocks until the latch is set.
    pub fn wait(&self) {
        let mut set = self.lock();
        while !*set {
            set = self
                .inner
                .1
                .wait(set)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until the latch is set or `timeout` elapses.
    ///
    /// Returns `true` if the latch was set.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut set = self.lock();
        while !*set {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return false;
            };
            set = self
                .inner
                .1
                .wait_timeout(set, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
        true
    }
}
