use std::collections::VecDeque;

use rand::Rng;

use crate::LoadFactor;
use crate::scheduler::{QueueStats, SchedulePolicy};
use crate::task::RunnableTask;
use crate::task_queue::TaskQueue;

/// Visits every non-empty queue round-robin, one task per visit.
///
/// The visit order starts at a randomized offset each tick so no queue is
/// systematically favored. Movement stops once the eligible-task buffer
/// reaches `load_factor × worker_count` or every queue is exhausted; with
/// an unbounded load factor every queue is drained completely instead.
#[derive(Debug)]
pub(crate) struct FairShare;

impl SchedulePolicy for FairShare {
    fn apply(
        &mut self,
        stats: &QueueStats,
        queues: &[TaskQueue],
        output: &mut VecDeque<RunnableTask>,
    ) -> usize {
        let target = match stats.load_factor {
            LoadFactor::Unbounded => {
                let mut moved = 0;
                for queue in queues {
                    moved += queue.pop_n(output, usize::MAX);
                }
                return moved;
            }
            LoadFactor::Bounded(factor) => factor.get().saturating_mul(stats.worker_count),
        };

        let queue_count = queues.len();
        let start = rand::rng().random_range(0..queue_count);
        let mut moved = 0;

        loop {
            let mut moved_this_sweep = false;

            for offset in 0..queue_count {
                if output.len() >= target {
                    return moved;
                }

                let index = (start + offset) % queue_count;
                if queues[index].pop_n(output, 1) > 0 {
                    moved += 1;
                    moved_this_sweep = true;
                }
            }

            if !moved_this_sweep {
                return moved;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use crate::scheduler::tests::{queue_with_tasks, stats_for};

    use super::*;

    #[test]
    fn takes_one_task_per_queue_per_sweep() {
        let queues = [
            queue_with_tasks(false, 10),
            queue_with_tasks(true, 10),
            queue_with_tasks(false, 10),
        ];
        let mut output = VecDeque::new();
        let mut policy = FairShare;

        // Target of 3: exactly one sweep over three non-empty queues.
        let stats = stats_for(&queues, &output, 3, LoadFactor::Bounded(nz!(1)));
        let moved = policy.apply(&stats, &queues, &mut output);

        assert_eq!(moved, 3);
        for queue in &queues {
            assert_eq!(queue.len(), 9);
        }
    }

    #[test]
    fn stops_at_the_target_batch_size() {
        let queues = [queue_with_tasks(false, 100), queue_with_tasks(false, 100)];
        let mut output = VecDeque::new();
        let mut policy = FairShare;

        let stats = stats_for(&queues, &output, 4, LoadFactor::Bounded(nz!(2)));
        let moved = policy.apply(&stats, &queues, &mut output);

        assert_eq!(moved, 8);
        assert_eq!(output.len(), 8);
    }

    #[test]
    fn exhausts_queues_below_the_target() {
        let queues = [queue_with_tasks(false, 2), queue_with_tasks(false, 1)];
        let mut output = VecDeque::new();
        let mut policy = FairShare;

        let stats = stats_for(&queues, &output, 16, LoadFactor::Bounded(nz!(2)));
        let moved = policy.apply(&stats, &queues, &mut output);

        assert_eq!(moved, 3);
    }

    #[test]
    fn unbounded_load_factor_drains_everything() {
        let queues = [queue_with_tasks(false, 50), queue_with_tasks(true, 70)];
        let mut output = VecDeque::new();
        let mut policy = FairShare;

        let stats = stats_for(&queues, &output, 2, LoadFactor::Unbounded);
        let moved = policy.apply(&stats, &queues, &mut output);

        assert_eq!(moved, 120);
        assert_eq!(output.len(), 120);
    }
}
