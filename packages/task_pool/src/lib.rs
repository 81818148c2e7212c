//! A pool of worker threads executing heterogeneous tasks pulled from
//! per-class queues under a pluggable scheduling policy, with priority
//! ordering, cooperative pause/resume/stop, graceful draining and a small
//! set of data-parallel algorithms (reduce, transform-reduce, sort) built
//! on the same scheduling primitives.
//!
//! # Architecture
//!
//! A [`TaskPool`] owns a fixed set of worker threads plus exactly one
//! scheduler thread. Submitted [`Task`]s land in the queue matching their
//! shape (arrival-ordered, priority-ordered or deadline-carrying); the
//! scheduler thread periodically moves a bounded batch of them into the
//! shared eligible-task buffer that workers consume from. Which queue gets
//! drained next is decided by the configured
//! [`SchedulingStrategy`]: fair-share (the default, with a bounded
//! unfairness guarantee), max-length, or first-available.
//!
//! Every submission returns a [`TaskFuture`] that resolves to the task's
//! result - or to the captured panic, which never takes down a worker.
//!
//! # Quick start
//!
//! ```
//! use task_pool::TaskPool;
//!
//! let pool = TaskPool::new();
//!
//! // Individual tasks, with or without priorities.
//! let answer = pool.enqueue(|| 21 * 2).unwrap();
//! assert_eq!(answer.wait().unwrap(), 42);
//!
//! // Wait for everything submitted so far.
//! pool.drain();
//! ```
//!
//! # Data-parallel algorithms
//!
//! ```
//! use new_zealand::nz;
//! use task_pool::{Partitioner, TaskPool};
//!
//! let pool = TaskPool::new();
//!
//! let data: Vec<i64> = (0..10_000).rev().collect();
//!
//! let minimum = pool
//!     .reduce(
//!         &data,
//!         i64::MAX,
//!         |a, b| a.min(b),
//!         Partitioner::equal_count(nz!(8)),
//!     )
//!     .unwrap();
//! assert_eq!(minimum, 0);
//!
//! let mut data = data;
//! pool.sort(&mut data).unwrap();
//! assert!(data.is_sorted());
//! ```
//!
//! # Lifecycle control
//!
//! [`TaskPool::pause()`] withholds execution without discarding queued
//! work; [`TaskPool::resume()`] picks it back up. [`TaskPool::shutdown()`]
//! stops the pool for good: in-flight tasks finish (up to a configurable
//! grace period), queued tasks are discarded, and later submissions fail
//! with [`PoolError::Stopped`]. All of it is cooperative - nothing is ever
//! force-killed.
//!
//! OS-level worker-thread configuration (scheduling policy, priority,
//! affinity, signal masks) is delegated to the `thread_config` package and
//! treated strictly as a set of hints: failures are logged and ignored.

mod cancellation;
mod config;
mod constants;
mod error;
mod job_queue;
mod parallel;
mod partition;
mod pool;
mod scheduler;
mod task;
mod task_queue;
mod worker;

pub use cancellation::*;
pub use config::*;
pub use error::*;
pub use partition::*;
pub use pool::*;
pub use task::{Task, TaskFuture};
