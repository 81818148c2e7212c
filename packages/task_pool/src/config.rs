use std::num::NonZero;
use std::thread;
use std::time::Duration;

use new_zealand::nz;
use thread_config::ThreadOptions;

use crate::TaskPool;

/// The scheduling strategy deciding which task queue is drained next.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display)]
#[non_exhaustive]
pub enum SchedulingStrategy {
    /// Scans the queues in a fixed rotation and drains the first non-empty
    /// one found, resuming the scan after that queue on the next tick so a
    /// single busy queue cannot starve the others.
    #[display("first-available")]
    FirstAvailable,

    /// Always drains whichever queue currently holds the most pending
    /// tasks. Maximizes amortized throughput under skewed load at the cost
    /// of possible starvation of low-volume queues.
    #[display("max-length")]
    MaxLength,

    /// Visits every non-empty queue round-robin, taking one task per visit,
    /// until the eligible-task buffer reaches `load_factor × worker_count`.
    /// The only strategy with a bounded-unfairness guarantee across task
    /// classes; the default.
    #[display("fair-share")]
    FairShare,
}

/// Bounds how many tasks the fair-share strategy makes eligible per
/// scheduling tick.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadFactor {
    /// Eligible tasks are capped at `factor × worker_count` per tick.
    Bounded(NonZero<usize>),

    /// Every queue is drained completely on each tick. Useful for small
    /// workloads where batching latency outweighs its benefit.
    Unbounded,
}

/// Immutable configuration of a [`TaskPool`].
///
/// Constructed once through [`TaskPool::builder()`] and shared by reference
/// with every component of the pool; there is no ambient or global state.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use new_zealand::nz;
/// use task_pool::{SchedulingStrategy, TaskPool};
///
/// let pool = TaskPool::builder()
///     .worker_count(nz!(4))
///     .strategy(SchedulingStrategy::FairShare)
///     .shutdown_grace(Duration::from_millis(500))
///     .build();
///
/// assert_eq!(pool.worker_count(), nz!(4));
/// ```
#[derive(Clone, Debug)]
pub struct PoolConfig {
    worker_count: NonZero<usize>,
    strategy: SchedulingStrategy,
    load_factor: LoadFactor,
    scheduler_tick: Duration,
    shutdown_grace: Duration,
    sort_cutoff: NonZero<usize>,
    thread_options: ThreadOptions,
}

impl PoolConfig {
    /// How long the scheduler sleeps between ticks when nothing wakes it
    /// explicitly.
    pub const DEFAULT_SCHEDULER_TICK: Duration = Duration::from_micros(60);

    /// How long shutdown waits for workers to finish their in-flight tasks
    /// before proceeding without them.
    pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(2000);

    /// Below this length, [`TaskPool::sort()`] falls back to a sequential
    /// in-place sort.
    pub const DEFAULT_SORT_CUTOFF: usize = 8192;

    fn default_worker_count() -> NonZero<usize> {
        // A pool of one worker is legal but degenerate; two is the useful
        // minimum when the hardware reports nothing better.
        thread::available_parallelism()
            .unwrap_or(nz!(2))
            .max(nz!(2))
    }

    /// The number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> NonZero<usize> {
        self.worker_count
    }

    /// The scheduling strategy.
    #[must_use]
    pub fn strategy(&self) -> SchedulingStrategy {
        self.strategy
    }

    /// The fair-share load factor.
    #[must_use]
    pub fn load_factor(&self) -> LoadFactor {
        self.load_factor
    }

    /// The scheduler tick interval.
    #[must_use]
    pub fn scheduler_tick(&self) -> Duration {
        self.scheduler_tick
    }

    /// The shutdown grace period.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    /// The sequential cutoff for [`TaskPool::sort()`].
    #[must_use]
    pub fn sort_cutoff(&self) -> NonZero<usize> {
        self.sort_cutoff
    }

    /// The OS-level configuration applied to every worker thread.
    #[must_use]
    pub fn thread_options(&self) -> &ThreadOptions {
        &self.thread_options
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: Self::default_worker_count(),
            strategy: SchedulingStrategy::FairShare,
            load_factor: LoadFactor::Bounded(nz!(2)),
            scheduler_tick: Self::DEFAULT_SCHEDULER_TICK,
            shutdown_grace: Self::DEFAULT_SHUTDOWN_GRACE,
            sort_cutoff: nz!(8192),
            thread_options: ThreadOptions::new(),
        }
    }
}

/// Builder for a [`TaskPool`].
///
/// Obtained from [`TaskPool::builder()`]; every setting has a sensible
/// default, so any subset of them may be configured.
#[derive(Clone, Debug, Default)]
pub struct PoolBuilder {
    config: PoolConfig,
}

impl PoolBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads.
    ///
    /// Defaults to the available parallelism of the machine, and never less
    /// than two.
    #[must_use]
    pub fn worker_count(mut self, count: NonZero<usize>) -> Self {
        self.config.worker_count = count;
        self
    }

    /// Sets the scheduling strategy. Defaults to
    /// [`SchedulingStrategy::FairShare`].
    #[must_use]
    pub fn strategy(mut self, strategy: SchedulingStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Sets the fair-share load factor. Defaults to a bound of 2.
    #[must_use]
    pub fn load_factor(mut self, load_factor: LoadFactor) -> Self {
        self.config.load_factor = load_factor;
        self
    }

    /// Sets the scheduler tick interval.
    #[must_use]
    pub fn scheduler_tick(mut self, tick: Duration) -> Self {
        self.config.scheduler_tick = tick;
        self
    }

    /// Sets the shutdown grace period.
    #[must_use]
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    /// Sets the sequential cutoff for [`TaskPool::sort()`].
    #[must_use]
    pub fn sort_cutoff(mut self, cutoff: NonZero<usize>) -> Self {
        self.config.sort_cutoff = cutoff;
        self
    }

    /// Sets the OS-level configuration applied to every worker thread.
    ///
    /// Failures to apply it are logged and otherwise ignored; these are
    /// scheduling hints and never affect correctness.
    #[must_use]
    pub fn thread_options(mut self, options: ThreadOptions) -> Self {
        self.config.thread_options = options;
        self
    }

    /// Builds the pool, spawning its worker and scheduler threads.
    #[must_use]
    pub fn build(self) -> TaskPool {
        TaskPool::with_config(self.config)
    }
}
