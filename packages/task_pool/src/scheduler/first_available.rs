use std::collections::VecDeque;

use crate::scheduler::{QueueStats, SchedulePolicy};
use crate::task::RunnableTask;
use crate::task_queue::TaskQueue;

/// Drains the first non-empty queue found, scanning in a fixed rotation.
///
/// The scan resumes after the last drained queue on the next tick, so a
/// permanently busy queue at a low index cannot starve the others.
#[derive(Debug)]
pub(crate) struct FirstAvailable {
    next_index: usize,
}

impl FirstAvailable {
    pub(crate) fn new() -> Self {
        Self { next_index: 0 }
    }
}

impl SchedulePolicy for FirstAvailable {
    fn apply(
        &mut self,
        stats: &QueueStats,
        queues: &[TaskQueue],
        output: &mut VecDeque<RunnableTask>,
    ) -> usize {
        let budget = stats.worker_count.saturating_sub(output.len());
        if budget == 0 {
            return 0;
        }

        let queue_count = queues.len();

        for offset in 0..queue_count {
            let index = (self.next_index + offset) % queue_count;
            let moved = queues[index].pop_n(output, budget);

            if moved > 0 {
                self.next_index = (index + 1) % queue_count;
                return moved;
            }
        }

        0
    }
}

#[cfg(test)]
mod tests {
    use crate::LoadFactor;
    use crate::scheduler::tests::{queue_with_tasks, stats_for};

    use super::*;

    #[test]
    fn drains_first_non_empty_queue() {
        let queues = [
            queue_with_tasks(false, 0),
            queue_with_tasks(true, 3),
            queue_with_tasks(false, 5),
        ];
        let mut output = VecDeque::new();
        let mut policy = FirstAvailable::new();

        let stats = stats_for(&queues, &output, 8, LoadFactor::Unbounded);
        let moved = policy.apply(&stats, &queues, &mut output);

        assert_eq!(moved, 3);
        assert_eq!(queues[1].len(), 0);
        assert_eq!(queues[2].len(), 5);
    }

    #[test]
    fn rotation_prevents_starvation() {
        let queues = [queue_with_tasks(false, 10), queue_with_tasks(false, 10)];
        let mut policy = FirstAvailable::new();

        let mut output = VecDeque::new();
        let stats = stats_for(&queues, &output, 2, LoadFactor::Unbounded);
        policy.apply(&stats, &queues, &mut output);
        output.clear();

        // The second tick must pick up where the first left off, reaching
        // the other queue instead of re-draining queue 0.
        let stats = stats_for(&queues, &output, 2, LoadFactor::Unbounded);
        policy.apply(&stats, &queues, &mut output);

        assert_eq!(queues[0].len(), 8);
        assert_eq!(queues[1].len(), 8);
    }

    #[test]
    fn respects_worker_budget() {
        let queues = [queue_with_tasks(false, 10)];
        let mut output = VecDeque::new();
        let mut policy = FirstAvailable::new();

        let stats = stats_for(&queues, &output, 4, LoadFactor::Unbounded);
        let moved = policy.apply(&stats, &queues, &mut output);

        assert_eq!(moved, 4);
        assert_eq!(output.len(), 4);
    }

    #[test]
    fn empty_queues_are_a_no_op() {
        let queues = [queue_with_tasks(false, 0)];
        let mut output = VecDeque::new();
        let mut policy = FirstAvailable::new();

        let stats = stats_for(&queues, &output, 4, LoadFactor::Unbounded);
        assert_eq!(policy.apply(&stats, &queues, &mut output), 0);
    }
}
