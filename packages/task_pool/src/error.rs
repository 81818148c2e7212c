use thiserror::Error;

/// Errors that can occur when submitting work to a pool.
///
/// Submission is rejected synchronously; no task is queued and no future is
/// returned when one of these is raised.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool has been closed and no longer accepts new tasks.
    ///
    /// Work that was already queued when the pool closed still executes.
    #[error("the pool is closed and no longer accepts new tasks")]
    Closed,

    /// The pool has been stopped.
    ///
    /// Queued work has been discarded and the worker threads have been asked
    /// to terminate.
    #[error("the pool has been stopped")]
    Stopped,
}

/// Errors reported by a task's future.
///
/// These are local to a single task; the pool itself remains fully
/// operational regardless of how many tasks fail.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum TaskError {
    /// The task's callable panicked while executing.
    ///
    /// The panic was captured on the worker thread; it does not affect any
    /// other task and does not terminate the worker.
    #[error("the task panicked while executing: {message}")]
    Panicked {
        /// The panic message, when the payload was a string.
        message: String,
    },

    /// The task was discarded before it could run, typically because the
    /// pool was stopped while the task was still queued.
    #[error("the task was discarded before it could run")]
    Abandoned,
}
