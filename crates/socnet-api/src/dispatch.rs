//! Bridge from async handlers onto the request worker pool
//!
//! ```text
//! handler ──submit──► WorkerPool ──► worker thread: borrow conn, query, drop conn
//!    ▲                                    │
//!    └──────────── oneshot ◄── on_complete┘
//! ```
//!
//! The handler never blocks a runtime thread: it awaits the oneshot that the
//! task's completion callback resolves. A refused submission resolves
//! immediately as `503`.

use std::sync::Arc;

use socnet_pool::{TaskOutcome, WorkerPool};
use tokio::sync::oneshot;

use crate::api::ApiError;

#[derive(Clone)]
pub struct Dispatcher {
    workers: Arc<WorkerPool>,
}

impl Dispatcher {
    pub fn new(workers: Arc<WorkerPool>) -> Self {
        Self { workers }
    }

    pub fn workers(&self) -> &Arc<WorkerPool> {
        &self.workers
    }

    /// Run `work` on a worker thread and await its result
    pub async fn run<F, T>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.workers.submit(work, move |outcome| {
            // Receiver is gone when the client disconnected
            let _ = tx.send(outcome);
        })?;

        match rx.await {
            Ok(TaskOutcome::Completed(result)) => result,
            Ok(TaskOutcome::Failed(reason)) => Err(ApiError::Internal(format!(
                "Server Error: request handler failed: {reason}"
            ))),
            Ok(TaskOutcome::Refused) => Err(ApiError::Unavailable(
                "Server Error: request was refused".to_string(),
            )),
            // Dropped unrun during shutdown
            Err(_) => Err(ApiError::Unavailable(
                "Server Error: service is shutting down".to_string(),
            )),
        }
    }
}
