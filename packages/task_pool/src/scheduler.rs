//! Scheduling strategies.
//!
//! A strategy is consulted by the scheduler thread once per tick. It
//! receives a read-only occupancy snapshot and moves a bounded batch of
//! tasks from the task queues into the pool's eligible-task buffer, which
//! is the only structure workers consume from. Strategies never fail; a
//! tick that finds nothing to move is a no-op.

use std::collections::VecDeque;

use crate::config::{LoadFactor, SchedulingStrategy};
use crate::task::RunnableTask;
use crate::task_queue::TaskQueue;

mod fair_share;
mod first_available;
mod max_length;

pub(crate) use fair_share::FairShare;
pub(crate) use first_available::FirstAvailable;
pub(crate) use max_length::MaxLength;

/// Immutable occupancy snapshot taken at the start of a scheduling tick.
///
/// Queue lengths may be slightly stale by the time tasks are moved; the
/// move operations themselves are race-free, so staleness only affects
/// which queue a strategy favors, never correctness.
#[derive(Clone, Debug)]
pub(crate) struct QueueStats {
    pub(crate) queue_lens: Vec<usize>,
    pub(crate) output_len: usize,
    pub(crate) worker_count: usize,
    pub(crate) load_factor: LoadFactor,
}

/// A pluggable scheduling algorithm.
pub(crate) trait SchedulePolicy: Send {
    /// Moves a batch of tasks from `queues` into `output` according to the
    /// strategy, returning how many tasks were moved.
    fn apply(
        &mut self,
        stats: &QueueStats,
        queues: &[TaskQueue],
        output: &mut VecDeque<RunnableTask>,
    ) -> usize;
}

/// Instantiates the strategy selected in the pool configuration.
pub(crate) fn policy_for(strategy: SchedulingStrategy) -> Box<dyn SchedulePolicy> {
    match strategy {
        SchedulingStrategy::FirstAvailable => Box::new(FirstAvailable::new()),
        SchedulingStrategy::MaxLength => Box::new(MaxLength),
        SchedulingStrategy::FairShare => Box::new(FairShare),
    }
}
