use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Instant;

use crate::TaskError;

/// Number of distinct task shapes; sizes the per-class queue registry.
pub(crate) const TASK_CLASS_COUNT: usize = 3;

/// The closed set of task shapes the pool distinguishes.
///
/// Each class has its own queue, so submissions of different classes never
/// contend with each other.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TaskClass {
    /// No priority; executed in arrival order.
    Immediate,

    /// Carries a priority; executed highest-priority-first.
    Prioritized,

    /// Carries a deadline; the worker sleeps until the deadline before
    /// running the payload.
    Timed,
}

impl TaskClass {
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Immediate => 0,
            Self::Prioritized => 1,
            Self::Timed => 2,
        }
    }
}

/// A unit of deferred work with a result channel.
///
/// A task wraps a callable and the sending half of a one-shot result channel.
/// The receiving half is the task's [`TaskFuture`], claimed either directly
/// via [`future()`][Self::future] or - the common path - returned by
/// [`TaskPool::schedule()`][crate::TaskPool::schedule].
///
/// A task executes at most once. Its result channel is fulfilled exactly
/// once: with the callable's return value, or with the captured panic if the
/// callable panicked.
///
/// # Example
///
/// ```
/// use task_pool::{Task, TaskPool};
///
/// let pool = TaskPool::new();
///
/// let task = Task::new(|| 21 * 2).with_priority(5);
/// let future = pool.schedule(task).unwrap();
///
/// assert_eq!(future.wait().unwrap(), 42);
/// ```
pub struct Task<T> {
    work: Box<dyn FnOnce() -> T + Send>,
    result_tx: oneshot::Sender<Result<T, TaskError>>,
    future: Option<TaskFuture<T>>,
    priority: Option<i64>,
    deadline: Option<Instant>,
}

impl<T> Task<T>
where
    T: Send + 'static,
{
    /// Creates a task from a callable.
    ///
    /// The task has no priority and no deadline; it executes in arrival
    /// order relative to other such tasks.
    #[must_use]
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();

        Self {
            work: Box::new(work),
            result_tx,
            future: Some(TaskFuture {
                receiver: result_rx,
            }),
            priority: None,
            deadline: None,
        }
    }

    /// Assigns a priority to the task.
    ///
    /// Higher values execute earlier. Tasks with equal priority execute in
    /// arrival order.
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Defers execution of the task until the given point in time.
    ///
    /// The deadline is honored by sleeping on the worker thread that picked
    /// the task up, so the wait occupies a worker slot for its duration.
    /// This is a documented limitation, not a scheduling feature; a deadline
    /// also takes precedence over any priority assigned to the task.
    #[must_use]
    pub fn run_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Changes the task's priority in place.
    pub fn set_priority(&mut self, priority: i64) {
        self.priority = Some(priority);
    }

    /// Returns the task's priority, if one was assigned.
    #[must_use]
    pub fn priority(&self) -> Option<i64> {
        self.priority
    }

    /// Returns the task's deadline, if one was assigned.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Claims the future of this task.
    ///
    /// # Panics
    ///
    /// Panics if the future has already been claimed. A task has exactly one
    /// future; use [`future_checked()`][Self::future_checked] to probe.
    pub fn future(&mut self) -> TaskFuture<T> {
        self.future_checked()
            .expect("the task's future has already been claimed")
    }

    /// Claims the future of this task, returning [`None`] if it has already
    /// been claimed.
    pub fn future_checked(&mut self) -> Option<TaskFuture<T>> {
        self.future.take()
    }

    pub(crate) fn class(&self) -> TaskClass {
        if self.deadline.is_some() {
            TaskClass::Timed
        } else if self.priority.is_some() {
            TaskClass::Prioritized
        } else {
            TaskClass::Immediate
        }
    }

    /// Erases the task into its runnable form.
    ///
    /// The runnable honors the deadline (by sleeping), executes the callable
    /// exactly once, captures any panic, and fulfills the result channel.
    pub(crate) fn into_runnable(self) -> RunnableTask {
        let Self {
            work,
            result_tx,
            deadline,
            ..
        } = self;

        RunnableTask::new(Box::new(move || {
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                }
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(work)).map_err(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!("task panicked while executing: {message}");
                TaskError::Panicked { message }
            });

            // Delivery fails only if the future was dropped, meaning nobody
            // is waiting for the result; that is the caller's choice.
            drop(result_tx.send(outcome));
        }))
    }
}

impl<T> Debug for Task<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("priority", &self.priority)
            .field("deadline", &self.deadline)
            .field("future_claimed", &self.future.is_none())
            .finish_non_exhaustive()
    }
}

/// The read side of a task's result channel.
///
/// Resolves to the task's return value, or to a [`TaskError`] if the task
/// panicked or was discarded before it could run.
pub struct TaskFuture<T> {
    receiver: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> TaskFuture<T> {
    /// Blocks until the task has finished and returns its result.
    ///
    /// # Errors
    ///
    /// [`TaskError::Panicked`] if the task's callable panicked;
    /// [`TaskError::Abandoned`] if the task was discarded before it could
    /// run (for example because the pool was stopped).
    pub fn wait(self) -> Result<T, TaskError> {
        match self.receiver.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(TaskError::Abandoned),
        }
    }
}

impl<T> Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFuture").finish_non_exhaustive()
    }
}

/// A type-erased task, ready to execute on any worker.
pub(crate) struct RunnableTask {
    run: Box<dyn FnOnce() + Send>,
}

impl RunnableTask {
    pub(crate) fn new(run: Box<dyn FnOnce() + Send>) -> Self {
        Self { run }
    }

    /// Runs the task. Panics never escape; they were captured at erasure
    /// time by the task's own wrapper.
    pub(crate) fn run(self) {
        (self.run)();
    }
}

impl Debug for RunnableTask {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnableTask").finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "(non-string panic payload)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Task<u32>: Send, Debug);
    assert_impl_all!(TaskFuture<u32>: Send, Debug);

    #[test]
    fn executes_and_delivers_result() {
        let mut task = Task::new(|| 42);
        let future = task.future();

        task.into_runnable().run();

        assert_eq!(future.wait().unwrap(), 42);
    }

    #[test]
    fn panic_is_captured_into_the_future() {
        let mut task = Task::new(|| -> u32 { panic!("boom") });
        let future = task.future();

        // Must not propagate the panic to us.
        task.into_runnable().run();

        assert_eq!(
            future.wait(),
            Err(TaskError::Panicked {
                message: "boom".to_string()
            })
        );
    }

    #[test]
    fn dropped_task_abandons_future() {
        let mut task = Task::new(|| 42);
        let future = task.future();

        drop(task);

        assert_eq!(future.wait(), Err(TaskError::Abandoned));
    }

    #[test]
    fn future_can_be_claimed_once() {
        let mut task = Task::new(|| 42);

        assert!(task.future_checked().is_some());
        assert!(task.future_checked().is_none());
    }

    #[test]
    #[should_panic(expected = "already been claimed")]
    fn second_claim_panics() {
        let mut task = Task::new(|| 42);

        drop(task.future());
        drop(task.future());
    }

    #[test]
    fn class_follows_priority_and_deadline() {
        assert_eq!(Task::new(|| ()).class(), TaskClass::Immediate);
        assert_eq!(
            Task::new(|| ()).with_priority(1).class(),
            TaskClass::Prioritized
        );
        assert_eq!(
            Task::new(|| ())
                .with_priority(1)
                .run_at(Instant::now())
                .class(),
            TaskClass::Timed
        );
    }
}
