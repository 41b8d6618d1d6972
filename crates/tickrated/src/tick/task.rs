//! Units of work executed by the tick thread.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Identifier assigned to a task when the scheduler accepts it.
pub type TaskId = u64;

type Work = Box<dyn FnOnce() + Send + 'static>;

/// A named, zero-argument unit of work.
pub struct Task {
    id: TaskId,
    name: String,
    work: Work,
}

impl Task {
    /// Wraps `work` under a display `name`. The id is assigned on admission.
    pub fn new(name: impl Into<String>, work: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id: 0,
            name: name.into(),
            work: Box::new(work),
        }
    }

    /// Identifier assigned by the scheduler.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn assign_id(&mut self, id: TaskId) {
        self.id = id;
    }

    /// Runs the work, converting a panic into its message.
    pub(crate) fn run(self) -> TaskRun {
        let Self { id, name, work } = self;
        let failure = panic::catch_unwind(AssertUnwindSafe(work))
            .err()
            .map(|payload| panic_message(payload.as_ref()));
        TaskRun { id, name, failure }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Record of one executed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    /// Task identifier.
    pub id: TaskId,
    /// Task display name.
    pub name: String,
    /// Panic message when the work panicked.
    pub failure: Option<String>,
}

impl TaskRun {
    /// Returns `true` when the work completed without panicking.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}
