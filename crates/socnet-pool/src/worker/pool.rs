//! Worker pool for request execution
//!
//! Fixed set of OS threads draining a bounded FIFO queue. Submissions that
//! find the queue full are refused immediately instead of waiting.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use super::stats::{Counters, PoolStats};
use super::task::{panic_message, QueuedTask, Runner, TaskId, TaskOutcome};

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Prefix for worker thread names (`<name>#<serial>`)
    pub name: String,

    /// Number of worker threads
    pub threads: usize,

    /// Maximum number of queued (not yet running) tasks
    pub capacity: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            name: "worker-pool".to_string(),
            threads: 1,
            capacity: 1024,
        }
    }
}

impl WorkerPoolConfig {
    /// Create a configuration with the given thread name prefix
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the number of worker threads
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set the queue capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

/// Worker pool errors
#[derive(Debug, thiserror::Error)]
pub enum WorkerPoolError {
    /// The OS refused to start a worker thread
    #[error("failed to spawn worker thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a submission was turned away
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The queue already holds `capacity` tasks
    #[error("task #{task_id} refused: queue is full (capacity {capacity})")]
    QueueFull { task_id: TaskId, capacity: usize },

    /// `shutdown` has been requested
    #[error("task #{task_id} refused: worker pool is shutting down")]
    ShuttingDown { task_id: TaskId },
}

impl SubmitError {
    /// Id consumed by the refused submission
    pub fn task_id(&self) -> TaskId {
        match self {
            SubmitError::QueueFull { task_id, .. } | SubmitError::ShuttingDown { task_id } => {
                *task_id
            }
        }
    }
}

struct QueueState {
    tasks: VecDeque<QueuedTask>,
    stopping: bool,
}

struct Shared {
    capacity: usize,
    queue: Mutex<QueueState>,
    task_available: Condvar,
    counters: Counters,
    // Completion barrier. Counters change outside this lock, but every change
    // is followed by a notify taken under it, so `wait_all` cannot miss one.
    drained_lock: Mutex<()>,
    drained: Condvar,
    terminated: AtomicBool,
}

impl Shared {
    fn notify_drained(&self) {
        let _guard = self.drained_lock.lock();
        self.drained.notify_all();
    }
}

/// Bounded worker pool with admission control
///
/// # Example
///
/// ```
/// use socnet_pool::{TaskOutcome, WorkerPool, WorkerPoolConfig};
///
/// let pool = WorkerPool::new(
///     WorkerPoolConfig::new("example").with_threads(2).with_capacity(16),
/// )
/// .unwrap();
///
/// pool.submit(|| 2 + 2, |outcome| assert_eq!(outcome, TaskOutcome::Completed(4)))
///     .unwrap();
/// pool.wait_all();
/// assert_eq!(pool.stats().completed, 1);
/// ```
pub struct WorkerPool {
    name: String,
    thread_count: usize,
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start `config.threads` workers
    pub fn new(config: WorkerPoolConfig) -> Result<Self, WorkerPoolError> {
        let shared = Arc::new(Shared {
            capacity: config.capacity,
            queue: Mutex::new(QueueState {
                tasks: VecDeque::with_capacity(config.capacity),
                stopping: false,
            }),
            task_available: Condvar::new(),
            counters: Counters::default(),
            drained_lock: Mutex::new(()),
            drained: Condvar::new(),
            terminated: AtomicBool::new(false),
        });

        let pool = Self {
            name: config.name.clone(),
            thread_count: config.threads,
            shared,
            threads: Mutex::new(Vec::with_capacity(config.threads)),
        };

        for serial in 0..config.threads {
            let thread_name = format!("{}#{}", config.name, serial);
            let shared = Arc::clone(&pool.shared);
            let worker_name = thread_name.clone();

            let handle = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker_loop(shared, worker_name))
                .map_err(|source| WorkerPoolError::Spawn {
                    name: thread_name,
                    source,
                })?;
            // On error `pool` is dropped here, which stops the threads
            // started so far.
            pool.threads.lock().push(handle);
        }

        info!(
            name = %config.name,
            threads = config.threads,
            capacity = config.capacity,
            "Started worker pool"
        );

        Ok(pool)
    }

    /// Queue `work`; `on_complete` is called exactly once with its outcome
    ///
    /// Never blocks. When the queue is full the callback is invoked on the
    /// calling thread with [`TaskOutcome::Refused`] and an error is returned.
    pub fn submit<F, T, C>(&self, work: F, on_complete: C) -> Result<TaskId, SubmitError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
        C: FnOnce(TaskOutcome<T>) + Send + 'static,
    {
        let mut queue = self.shared.queue.lock();
        let task_id = self.shared.counters.next_id();

        let refusal = if queue.stopping {
            SubmitError::ShuttingDown { task_id }
        } else if queue.tasks.len() < self.shared.capacity {
            queue
                .tasks
                .push_back(QueuedTask::new(task_id, work, on_complete));
            self.shared.task_available.notify_one();
            return Ok(task_id);
        } else {
            SubmitError::QueueFull {
                task_id,
                capacity: self.shared.capacity,
            }
        };

        self.shared.counters.record_refused();
        drop(queue);
        self.shared.notify_drained();

        debug!(pool = %self.name, task_id, "{}", refusal);
        on_complete(TaskOutcome::Refused);
        Err(refusal)
    }

    /// Queue `work` without a completion callback
    pub fn execute<F>(&self, work: F) -> Result<TaskId, SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(work, |_| {})
    }

    /// Block until every submitted task has completed or been refused
    ///
    /// Also returns once the pool has been shut down, since abandoned tasks
    /// will never complete.
    pub fn wait_all(&self) {
        let mut guard = self.shared.drained_lock.lock();
        while !self.shared.counters.is_quiescent()
            && !self.shared.terminated.load(Ordering::SeqCst)
        {
            self.shared.drained.wait(&mut guard);
        }
    }

    /// Stop the workers and join them
    ///
    /// Running tasks finish; queued tasks are dropped without being run and
    /// without their callbacks being invoked. Safe to call more than once.
    pub fn shutdown(&self) {
        let abandoned = {
            let mut queue = self.shared.queue.lock();
            queue.stopping = true;
            std::mem::take(&mut queue.tasks)
        };
        self.shared.task_available.notify_all();

        // Only the caller that took the handles marks the pool terminated,
        // after they are joined
        let handles = std::mem::take(&mut *self.threads.lock());
        let owner = !handles.is_empty();
        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                // Shutdown requested from one of our own tasks
                continue;
            }
            if handle.join().is_err() {
                error!(pool = %self.name, "worker thread terminated abnormally");
            }
        }

        if !abandoned.is_empty() {
            warn!(
                pool = %self.name,
                count = abandoned.len(),
                "Dropping queued tasks on shutdown"
            );
        }
        drop(abandoned);

        if owner && !self.shared.terminated.swap(true, Ordering::SeqCst) {
            info!(pool = %self.name, "Worker pool stopped");
        }
        self.shared.notify_drained();
    }

    /// Counters snapshot
    pub fn stats(&self) -> PoolStats {
        let queued = self.shared.queue.lock().tasks.len();
        self.shared.counters.snapshot(queued)
    }

    /// Tasks currently waiting in the queue
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().tasks.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("thread_count", &self.thread_count)
            .field("stats", &self.stats())
            .finish()
    }
}

fn worker_loop(shared: Arc<Shared>, thread_name: String) {
    debug!(thread = %thread_name, "Worker started");

    loop {
        let task = {
            let mut queue = shared.queue.lock();
            while queue.tasks.is_empty() && !queue.stopping {
                shared.task_available.wait(&mut queue);
            }
            if queue.stopping {
                break;
            }
            match queue.tasks.pop_front() {
                Some(task) => task,
                None => continue,
            }
        };

        let task_id = task.id;
        trace!(thread = %thread_name, task_id, "start processing task");

        let runner = Runner {
            thread_name: &thread_name,
            task_id,
        };
        // The work itself is guarded inside the job; this catches a panicking
        // completion callback so the worker survives it.
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (task.job)(&runner))) {
            error!(
                thread = %thread_name,
                task_id,
                reason = %panic_message(payload.as_ref()),
                "completion callback panicked"
            );
        }

        trace!(thread = %thread_name, task_id, "end processing task");

        shared.counters.record_completed();
        shared.notify_drained();
    }

    debug!(thread = %thread_name, "Worker stopped");
}

/// Queue abstraction used by a transport that hands us its connections
///
/// `enqueue` returns `true` exactly when the job was accepted; on `false` the
/// transport must drop the corresponding connection. `shutdown` drains: it
/// returns once everything accepted so far has finished.
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, job: Box<dyn FnOnce() + Send + 'static>) -> bool;

    fn shutdown(&self);
}

impl TaskQueue for WorkerPool {
    fn enqueue(&self, job: Box<dyn FnOnce() + Send + 'static>) -> bool {
        self.execute(job).is_ok()
    }

    fn shutdown(&self) {
        self.wait_all();
    }
}
