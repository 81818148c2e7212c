use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt::{self, Debug, Formatter};
use std::sync::Mutex;

use crate::constants::ERR_POISONED_LOCK;
use crate::task::RunnableTask;

/// A thread-safe container of pending tasks of one class.
///
/// Two storage disciplines exist: arrival order (FIFO) and priority order
/// (max-heap with insertion-order ties). All operations are total: popping
/// from an empty queue reports "no item" rather than blocking or failing.
///
/// Each queue has its own lock, so operations on distinct queues never
/// contend.
pub(crate) struct TaskQueue {
    storage: Mutex<Storage>,
}

enum Storage {
    Fifo(VecDeque<RunnableTask>),
    Prioritized {
        heap: BinaryHeap<PrioritizedEntry>,
        next_seq: u64,
    },
}

/// A heap entry; ordered by priority, with the monotonic insertion sequence
/// breaking ties so that equal-priority tasks keep their arrival order.
struct PrioritizedEntry {
    priority: i64,
    seq: u64,
    task: RunnableTask,
}

impl PartialEq for PrioritizedEntry {
    fn eq(&self, other: &Self) -> bool {
        // The sequence number is unique within a queue.
        self.seq == other.seq
    }
}

impl Eq for PrioritizedEntry {}

impl PartialOrd for PrioritizedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority wins; for equal priorities the earlier
        // insertion (lower sequence) must surface first.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl TaskQueue {
    /// Creates a queue that yields tasks in arrival order.
    pub(crate) fn fifo() -> Self {
        Self {
            storage: Mutex::new(Storage::Fifo(VecDeque::new())),
        }
    }

    /// Creates a queue that yields tasks in priority order.
    pub(crate) fn prioritized() -> Self {
        Self {
            storage: Mutex::new(Storage::Prioritized {
                heap: BinaryHeap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Inserts one task, returning the number of tasks inserted (always 1).
    ///
    /// A task without a priority inserted into a priority queue compares as
    /// lowest priority.
    pub(crate) fn put(&self, priority: Option<i64>, task: RunnableTask) -> usize {
        self.put_batch(std::iter::once((priority, task)))
    }

    /// Inserts a batch of tasks in one locked step, returning the total
    /// number inserted.
    pub(crate) fn put_batch(
        &self,
        tasks: impl IntoIterator<Item = (Option<i64>, RunnableTask)>,
    ) -> usize {
        let mut storage = self.storage.lock().expect(ERR_POISONED_LOCK);
        let mut inserted = 0;

        match &mut *storage {
            Storage::Fifo(queue) => {
                for (_, task) in tasks {
                    queue.push_back(task);
                    inserted += 1;
                }
            }
            Storage::Prioritized { heap, next_seq } => {
                for (priority, task) in tasks {
                    let seq = *next_seq;
                    *next_seq += 1;

                    heap.push(PrioritizedEntry {
                        priority: priority.unwrap_or(i64::MIN),
                        seq,
                        task,
                    });
                    inserted += 1;
                }
            }
        }

        inserted
    }

    /// Removes and returns the highest-priority (or oldest) task.
    pub(crate) fn pop(&self) -> Option<RunnableTask> {
        let mut storage = self.storage.lock().expect(ERR_POISONED_LOCK);

        match &mut *storage {
            Storage::Fifo(queue) => queue.pop_front(),
            Storage::Prioritized { heap, .. } => heap.pop().map(|entry| entry.task),
        }
    }

    /// Removes up to `limit` tasks in priority/arrival order in one locked
    /// step, appending them to `output`. Returns the number moved.
    pub(crate) fn pop_n(&self, output: &mut VecDeque<RunnableTask>, limit: usize) -> usize {
        let mut storage = self.storage.lock().expect(ERR_POISONED_LOCK);
        let mut moved = 0;

        while moved < limit {
            let task = match &mut *storage {
                Storage::Fifo(queue) => queue.pop_front(),
                Storage::Prioritized { heap, .. } => heap.pop().map(|entry| entry.task),
            };

            let Some(task) = task else { break };

            output.push_back(task);
            moved += 1;
        }

        moved
    }

    /// Returns the number of pending tasks.
    pub(crate) fn len(&self) -> usize {
        let storage = self.storage.lock().expect(ERR_POISONED_LOCK);

        match &*storage {
            Storage::Fifo(queue) => queue.len(),
            Storage::Prioritized { heap, .. } => heap.len(),
        }
    }

    /// Discards all pending tasks, returning how many were discarded.
    pub(crate) fn clear(&self) -> usize {
        let mut storage = self.storage.lock().expect(ERR_POISONED_LOCK);

        match &mut *storage {
            Storage::Fifo(queue) => {
                let discarded = queue.len();
                queue.clear();
                discarded
            }
            Storage::Prioritized { heap, .. } => {
                let discarded = heap.len();
                heap.clear();
                discarded
            }
        }
    }
}

impl Debug for TaskQueue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use super::*;

    /// A runnable that records its identity into a shared log when run.
    fn recording_task(id: usize, log: &Arc<StdMutex<Vec<usize>>>) -> RunnableTask {
        let log = Arc::clone(log);
        RunnableTask::new(Box::new(move || {
            log.lock().unwrap().push(id);
        }))
    }

    fn run_all(queue: &TaskQueue) {
        while let Some(task) = queue.pop() {
            task.run();
        }
    }

    #[test]
    fn fifo_preserves_arrival_order() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let queue = TaskQueue::fifo();

        for id in 0..5 {
            assert_eq!(queue.put(None, recording_task(id, &log)), 1);
        }

        run_all(&queue);

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn priority_order_with_stable_ties() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let queue = TaskQueue::prioritized();

        queue.put(Some(1), recording_task(0, &log));
        queue.put(Some(3), recording_task(1, &log));
        queue.put(Some(3), recording_task(2, &log));
        queue.put(Some(2), recording_task(3, &log));
        queue.put(None, recording_task(4, &log));

        run_all(&queue);

        // Non-increasing priority; the two priority-3 tasks keep their
        // arrival order; the priority-less task compares as lowest.
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 0, 4]);
    }

    #[test]
    fn pop_n_moves_in_order_and_stops_at_limit() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let queue = TaskQueue::prioritized();

        for (id, priority) in [(0, 5), (1, 9), (2, 7)] {
            queue.put(Some(priority), recording_task(id, &log));
        }

        let mut output = VecDeque::new();
        assert_eq!(queue.pop_n(&mut output, 2), 2);
        assert_eq!(queue.len(), 1);

        for task in output.drain(..) {
            task.run();
        }

        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn pop_n_on_empty_queue_is_a_no_op() {
        let queue = TaskQueue::fifo();
        let mut output = VecDeque::new();

        assert_eq!(queue.pop_n(&mut output, 16), 0);
        assert!(output.is_empty());
    }

    #[test]
    fn batch_insertion_counts_all_tasks() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let queue = TaskQueue::fifo();

        let batch = (0..10)
            .map(|id| (None, recording_task(id, &log)))
            .collect::<Vec<_>>();

        assert_eq!(queue.put_batch(batch), 10);
        assert_eq!(queue.len(), 10);
    }

    #[test]
    fn clear_discards_everything() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let queue = TaskQueue::fifo();

        for id in 0..4 {
            queue.put(None, recording_task(id, &log));
        }

        assert_eq!(queue.clear(), 4);
        assert_eq!(queue.len(), 0);
        assert!(queue.pop().is_none());
    }
}
