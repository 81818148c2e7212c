use std::cmp::Ordering;
use std::num::NonZero;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::cancellation::CancellationToken;
use crate::config::{PoolBuilder, PoolConfig};
use crate::constants::ERR_POISONED_LOCK;
use crate::job_queue::JobQueue;
use crate::task::TaskClass;
use crate::worker::WorkerPool;
use crate::{Partitioner, PoolError, Task, TaskFuture, parallel};

/// A pool of worker threads executing heterogeneous tasks under a pluggable
/// scheduling policy.
///
/// Tasks are submitted with [`schedule()`][Self::schedule] /
/// [`enqueue()`][Self::enqueue], land in a per-class queue (arrival-ordered,
/// priority-ordered or deadline-carrying), and are moved into the workers'
/// eligible buffer by a dedicated scheduler thread according to the
/// configured [`SchedulingStrategy`][crate::SchedulingStrategy].
///
/// The pool supports cooperative [`pause()`][Self::pause] /
/// [`resume()`][Self::resume], graceful [`drain()`][Self::drain] and
/// idempotent [`shutdown()`][Self::shutdown], and offers data-parallel
/// [`reduce()`][Self::reduce], [`transform_reduce()`][Self::transform_reduce]
/// and [`sort()`][Self::sort] built on the same scheduling primitives.
///
/// # Example
///
/// ```
/// use task_pool::TaskPool;
///
/// let pool = TaskPool::new();
///
/// let doubled = pool.enqueue(|| 21 * 2).unwrap();
/// assert_eq!(doubled.wait().unwrap(), 42);
///
/// let mut data = vec![3, 1, 2];
/// pool.sort(&mut data).unwrap();
/// assert_eq!(data, vec![1, 2, 3]);
/// ```
///
/// # Lifecycle
///
/// Dropping the pool shuts it down: queued-but-unstarted tasks are
/// discarded (their futures resolve to
/// [`TaskError::Abandoned`][crate::TaskError::Abandoned]) and workers are
/// joined once their in-flight task finishes, up to the configured grace
/// period. Call [`drain()`][Self::drain] first if all queued work must
/// complete.
#[derive(Debug)]
pub struct TaskPool {
    config: PoolConfig,
    jobq: Arc<JobQueue>,
    token: CancellationToken,
    threads: Mutex<WorkerPool>,
}

impl TaskPool {
    /// Creates a pool with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Starts configuring a pool.
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    pub(crate) fn with_config(config: PoolConfig) -> Self {
        let jobq = Arc::new(JobQueue::new());
        let token = CancellationToken::new();
        let threads = WorkerPool::start(&jobq, &config, &token);

        Self {
            config,
            jobq,
            token,
            threads: Mutex::new(threads),
        }
    }

    /// Submits an already-constructed task and returns its future.
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] or [`PoolError::Stopped`] when the pool no
    /// longer accepts submissions; the task is dropped in that case and
    /// never executes.
    ///
    /// # Panics
    ///
    /// Panics if the task's future was already claimed via
    /// [`Task::future()`].
    pub fn schedule<T>(&self, mut task: Task<T>) -> Result<TaskFuture<T>, PoolError>
    where
        T: Send + 'static,
    {
        let future = task
            .future_checked()
            .expect("the task's future was claimed before scheduling");
        let class = task.class();
        let priority = task.priority();

        self.jobq.submit(class, priority, task.into_runnable())?;

        Ok(future)
    }

    /// Submits a batch of tasks in one call, returning one future per task
    /// in submission order.
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] or [`PoolError::Stopped`] when the pool no
    /// longer accepts submissions.
    ///
    /// # Panics
    ///
    /// Panics if any task's future was already claimed.
    pub fn schedule_batch<T>(&self, tasks: Vec<Task<T>>) -> Result<Vec<TaskFuture<T>>, PoolError>
    where
        T: Send + 'static,
    {
        let mut futures = Vec::with_capacity(tasks.len());
        // One bucket per class keeps each class a single queue operation.
        let mut buckets = [
            (TaskClass::Immediate, Vec::new()),
            (TaskClass::Prioritized, Vec::new()),
            (TaskClass::Timed, Vec::new()),
        ];

        for mut task in tasks {
            futures.push(
                task.future_checked()
                    .expect("a task's future was claimed before scheduling"),
            );

            let class = task.class();
            let priority = task.priority();
            buckets[class.index()].1.push((priority, task.into_runnable()));
        }

        for (class, batch) in buckets {
            if batch.is_empty() {
                continue;
            }

            self.jobq.submit_batch(class, batch)?;
        }

        Ok(futures)
    }

    /// Constructs a task from a callable and schedules it.
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] or [`PoolError::Stopped`] when the pool no
    /// longer accepts submissions.
    pub fn enqueue<T, F>(&self, work: F) -> Result<TaskFuture<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.schedule(Task::new(work))
    }

    /// Schedules a callable to run no earlier than `deadline`.
    ///
    /// The wait occupies a worker slot for its duration (the worker sleeps
    /// until the deadline); this is a documented limitation, not a
    /// scheduling feature.
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] or [`PoolError::Stopped`] when the pool no
    /// longer accepts submissions.
    pub fn enqueue_at<T, F>(&self, deadline: Instant, work: F) -> Result<TaskFuture<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.schedule(Task::new(work).run_at(deadline))
    }

    /// Schedules a callable to run no earlier than `delay` from now.
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] or [`PoolError::Stopped`] when the pool no
    /// longer accepts submissions.
    pub fn enqueue_after<T, F>(&self, delay: Duration, work: F) -> Result<TaskFuture<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.enqueue_at(Instant::now() + delay, work)
    }

    /// Runs `action` once per element, one task per element, and waits for
    /// all of them.
    ///
    /// A panic in `action` is re-raised on the calling thread after every
    /// task has settled.
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] or [`PoolError::Stopped`] when the pool no
    /// longer accepts submissions or is stopped mid-run.
    pub fn for_each<T, F>(&self, items: &[T], action: F) -> Result<(), PoolError>
    where
        T: Sync,
        F: Fn(&T) + Sync,
    {
        parallel::for_each(&self.jobq, items, &action)
    }

    /// Folds `items` with `reduce_op`, computing partitions in parallel.
    ///
    /// `init` must be the identity of `reduce_op` (it seeds every partition
    /// and the join), and `reduce_op` must be associative. Partial results
    /// are joined in partition order, so commutativity is not required.
    ///
    /// Blocks until the result is available.
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] or [`PoolError::Stopped`] when the pool no
    /// longer accepts submissions or is stopped mid-run.
    ///
    /// # Example
    ///
    /// ```
    /// use new_zealand::nz;
    /// use task_pool::{Partitioner, TaskPool};
    ///
    /// let pool = TaskPool::new();
    /// let data: Vec<i64> = (1..=100).collect();
    ///
    /// let sum = pool
    ///     .reduce(&data, 0, |a, b| a + b, Partitioner::equal_count(nz!(7)))
    ///     .unwrap();
    ///
    /// assert_eq!(sum, 5050);
    /// ```
    pub fn reduce<T, R>(
        &self,
        items: &[T],
        init: T,
        reduce_op: R,
        partitioner: Partitioner,
    ) -> Result<T, PoolError>
    where
        T: Send + Sync + Clone,
        R: Fn(T, T) -> T + Sync,
    {
        self.transform_reduce(items, init, reduce_op, T::clone, partitioner)
    }

    /// Transforms every element with `transform` and folds the results with
    /// `reduce_op`, computing partitions in parallel.
    ///
    /// See [`reduce()`][Self::reduce] for the identity and associativity
    /// requirements on `init` and `reduce_op`.
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] or [`PoolError::Stopped`] when the pool no
    /// longer accepts submissions or is stopped mid-run.
    pub fn transform_reduce<T, A, R, U>(
        &self,
        items: &[T],
        init: A,
        reduce_op: R,
        transform: U,
        partitioner: Partitioner,
    ) -> Result<A, PoolError>
    where
        T: Sync,
        A: Send + Clone,
        R: Fn(A, A) -> A + Sync,
        U: Fn(&T) -> A + Sync,
    {
        parallel::transform_reduce(&self.jobq, items, init, &reduce_op, &transform, partitioner)
    }

    /// Sorts `items` using the pool's workers.
    ///
    /// Blocks until the slice is sorted. Inputs at or below the configured
    /// sort cutoff are sorted sequentially on the calling thread.
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] or [`PoolError::Stopped`] when the pool no
    /// longer accepts submissions or is stopped mid-run; the slice contents
    /// are a permutation of the input in that case, but not necessarily
    /// sorted.
    pub fn sort<T>(&self, items: &mut [T]) -> Result<(), PoolError>
    where
        T: Ord + Send,
    {
        self.sort_by(items, T::cmp)
    }

    /// Sorts `items` with a caller-supplied comparator using the pool's
    /// workers.
    ///
    /// # Errors
    ///
    /// As for [`sort()`][Self::sort].
    pub fn sort_by<T, F>(&self, items: &mut [T], compare: F) -> Result<(), PoolError>
    where
        T: Send,
        F: Fn(&T, &T) -> Ordering + Sync,
    {
        parallel::sort_by(
            &self.jobq,
            items,
            &compare,
            self.config.worker_count().get(),
            self.config.sort_cutoff().get(),
        )
    }

    /// Blocks until every task submitted before this call has finished
    /// executing.
    ///
    /// Tasks submitted while the drain is in progress are not covered by
    /// it. A paused pool makes no progress, so draining one blocks until it
    /// is resumed.
    pub fn drain(&self) {
        self.jobq.drain();
    }

    /// Withholds execution: workers finish their in-flight task and then
    /// park until [`resume()`][Self::resume]. Queued work is not discarded.
    pub fn pause(&self) {
        self.token.request_pause();
        self.jobq.wake_all();
    }

    /// Clears a pause and wakes every parked thread.
    pub fn resume(&self) {
        self.token.request_resume();
        self.jobq.wake_all();
    }

    /// Closes the pool to new submissions.
    ///
    /// Already-queued work continues to execute; subsequent submissions
    /// fail with [`PoolError::Closed`].
    pub fn close(&self) {
        self.jobq.close();
    }

    /// Stops the pool.
    ///
    /// Closes submissions, requests cancellation, waits up to the
    /// configured grace period for workers to finish their in-flight tasks
    /// and discards everything still queued (those futures resolve to
    /// [`TaskError::Abandoned`][crate::TaskError::Abandoned]). Workers that
    /// are still busy after the grace period are detached, never killed.
    ///
    /// Idempotent: repeated calls (including the implicit one in `Drop`)
    /// are no-ops.
    pub fn shutdown(&self) {
        self.jobq.close();
        let workers_exited = self.jobq.stop(&self.token, self.config.shutdown_grace());
        self.threads
            .lock()
            .expect(ERR_POISONED_LOCK)
            .join(workers_exited);
    }

    /// Advisory count of submitted-but-unfinished tasks.
    ///
    /// Not synchronized with in-flight execution; by the time the value is
    /// observed it may already be stale.
    #[must_use]
    pub fn size(&self) -> usize {
        self.jobq.size()
    }

    /// The number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> NonZero<usize> {
        self.config.worker_count()
    }

    /// The pool's configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskPool {
    #[cfg_attr(test, mutants::skip)] // Impractical to test that stuff stops happening.
    fn drop(&mut self) {
        if thread::panicking() {
            // If the thread is panicking, we are probably in a dirty state
            // and shutting down may make the problem worse by hiding the
            // original panic, so just do nothing.
            return;
        }

        self.shutdown();
    }
}
