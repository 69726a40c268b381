//! # socnet pooling engines
//!
//! Two cooperating resource pools that keep the service bounded under load.
//!
//! ```text
//! ┌──────────────┐ submit  ┌───────────────────────────────┐
//! │  transport   │ ──────► │          WorkerPool            │
//! └──────────────┘ refused │  bounded queue ─► N threads    │
//!        ▲ ◄────────────── └───────────────┬───────────────┘
//!        │  on_complete                    │ borrow / drop
//!        │                                 ▼
//!        │                 ┌───────────────────────────────┐
//!        └──────────────── │        ConnectionPool          │
//!                          │  primary[..]   replica[..]     │
//!                          │  (idle queues, round-robin)    │
//!                          └───────────────────────────────┘
//! ```
//!
//! A task is admitted only while the queue has room. Once running it borrows
//! exactly one connection through a [`PooledConnection`] guard, which puts the
//! connection back on the node it came from when dropped.
//!
//! ## Example
//!
//! ```ignore
//! use socnet_pool::{ConnectionPool, Role, WorkerPool, WorkerPoolConfig};
//!
//! let workers = WorkerPool::new(WorkerPoolConfig::new("HttpSrvPool").with_threads(4))?;
//! let db = Arc::new(ConnectionPool::new(manager, primaries, replicas, settings)?);
//!
//! workers.submit(
//!     move || {
//!         let conn = db.get(Role::Replica)?;
//!         run_query(&conn)
//!     },
//!     |outcome| println!("{outcome:?}"),
//! )?;
//! ```

pub mod connection;
pub mod worker;

pub use connection::{
    Borrowed, ConnectionPool, ManageConnection, NodeConfig, PoolError, PoolSettings,
    PooledConnection, Role,
};
pub use worker::{
    PoolStats, SubmitError, TaskId, TaskOutcome, TaskQueue, WorkerPool, WorkerPoolConfig,
    WorkerPoolError,
};
