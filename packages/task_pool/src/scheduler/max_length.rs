use std::cmp::Reverse;
use std::collections::VecDeque;

use crate::scheduler::{QueueStats, SchedulePolicy};
use crate::task::RunnableTask;
use crate::task_queue::TaskQueue;

/// Always drains the queue with the most pending tasks.
///
/// Maximizes amortized throughput under skewed load; a steady trickle into
/// a short queue can starve while a long queue dominates. Ties are broken
/// by registry position. The eligible-task buffer is never filled beyond
/// the worker count.
#[derive(Debug)]
pub(crate) struct MaxLength;

impl SchedulePolicy for MaxLength {
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

        let Some((index, &len)) = stats
            .queue_lens
            .iter()
            .enumerate()
            .max_by_key(|&(index, &len)| (len, Reverse(index)))
        else {
            return 0;
        };

        if len == 0 {
            return 0;
        }

        queues[index].pop_n(output, budget.min(len))
    }
}

#[cfg(test)]
mod tests {
    use crate::LoadFactor;
    use crate::scheduler::tests::{queue_with_tasks, stats_for};

    use super::*;

    #[test]
    fn drains_the_longest_queue() {
        let queues = [
            queue_with_tasks(false, 2),
            queue_with_tasks(true, 9),
            queue_with_tasks(false, 4),
        ];
        let mut output = VecDeque::new();
        let mut policy = MaxLength;

        let stats = stats_for(&queues, &output, 16, LoadFactor::Unbounded);
        let moved = policy.apply(&stats, &queues, &mut output);

        assert_eq!(moved, 9);
        assert_eq!(queues[1].len(), 0);
        assert_eq!(queues[0].len(), 2);
    }

    #[test]
    fn ties_break_by_registry_position() {
        let queues = [queue_with_tasks(false, 5), queue_with_tasks(false, 5)];
        let mut output = VecDeque::new();
        let mut policy = MaxLength;

        let stats = stats_for(&queues, &output, 16, LoadFactor::Unbounded);
        policy.apply(&stats, &queues, &mut output);

        assert_eq!(queues[0].len(), 0);
        assert_eq!(queues[1].len(), 5);
    }

    #[test]
    fn output_buffer_is_capped_at_worker_count() {
        let queues = [queue_with_tasks(false, 100)];
        let mut output = VecDeque::new();
        let mut policy = MaxLength;

        let stats = stats_for(&queues, &output, 8, LoadFactor::Unbounded);
        assert_eq!(policy.apply(&stats, &queues, &mut output), 8);

        // A full buffer means nothing more is moved this tick.
        let stats = stats_for(&queues, &output, 8, LoadFactor::Unbounded);
        assert_eq!(policy.apply(&stats, &queues, &mut output), 0);
    }
}
