//! Tasks queued on a [`WorkerPool`](super::WorkerPool)

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Sequence number assigned to every submission, refused or not.
pub type TaskId = u64;

/// What a completion callback is told about its task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    /// The work ran to completion and produced a value
    Completed(T),
    /// The work panicked; the panic message is kept for the caller
    Failed(String),
    /// The task was never run (queue full or pool shutting down)
    Refused,
}

impl<T> TaskOutcome<T> {
    /// The produced value, if the task completed
    pub fn into_value(self) -> Option<T> {
        match self {
            TaskOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_refused(&self) -> bool {
        matches!(self, TaskOutcome::Refused)
    }
}

/// Type-erased unit of work owned by the queue.
pub(crate) type Job = Box<dyn FnOnce(&Runner<'_>) + Send + 'static>;

/// Identity of the worker executing a job, used for log context.
pub(crate) struct Runner<'a> {
    pub thread_name: &'a str,
    pub task_id: TaskId,
}

pub(crate) struct QueuedTask {
    pub id: TaskId,
    pub job: Job,
}

impl QueuedTask {
    /// Wrap `work` and its callback so the worker loop only sees a `Job`.
    ///
    /// The work runs under `catch_unwind`; a panic becomes
    /// [`TaskOutcome::Failed`] and is logged with the task id.
    pub fn new<F, T, C>(id: TaskId, work: F, on_complete: C) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
        C: FnOnce(TaskOutcome<T>) + Send + 'static,
    {
        let job: Job = Box::new(move |runner: &Runner<'_>| {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(work)) {
                Ok(value) => TaskOutcome::Completed(value),
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    tracing::error!(
                        thread = runner.thread_name,
                        task_id = runner.task_id,
                        %reason,
                        "task panicked"
                    );
                    TaskOutcome::Failed(reason)
                }
            };
            on_complete(outcome);
        });

        Self { id, job }
    }
}

/// Best-effort extraction of a panic payload's message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
