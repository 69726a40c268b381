//! Bounded worker pool
//!
//! ```text
//! submit ──► [ queue (≤ capacity) ] ──► worker#0 ─┐
//!    │                               ──► worker#1 ─┼─► on_complete(outcome)
//!    └─ full ─► on_complete(Refused) ──► worker#N ─┘
//! ```
//!
//! Every submission gets a fresh [`TaskId`], accepted or not. At any quiet
//! moment `last_id == completed + refused`, which is what
//! [`WorkerPool::wait_all`] waits for.

mod pool;
mod stats;
mod task;

pub use pool::{SubmitError, TaskQueue, WorkerPool, WorkerPoolConfig, WorkerPoolError};
pub use stats::PoolStats;
pub use task::{TaskId, TaskOutcome};
