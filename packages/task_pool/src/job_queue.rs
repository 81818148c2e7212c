use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::PoolError;
use crate::cancellation::CancellationToken;
use crate::config::LoadFactor;
use crate::constants::ERR_POISONED_LOCK;
use crate::scheduler::{QueueStats, SchedulePolicy};
use crate::task::{RunnableTask, TASK_CLASS_COUNT, TaskClass};
use crate::task_queue::TaskQueue;

/// Lifecycle of the job queue. Transitions only move rightward:
/// `Open → Closing → Stopped`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Lifecycle {
    /// Accepting submissions; both loops run.
    Open,

    /// Rejecting submissions; existing work continues to drain.
    Closing,

    /// Terminal. Queued work has been discarded and the loops have exited.
    Stopped,
}

/// Routes tasks between submitters, the scheduler thread and the workers.
///
/// Owns the per-class task queues, the buffer of eligible (type-erased)
/// tasks and the outstanding-work counter. A task is always in exactly one
/// of: its class queue, the eligible buffer, or a worker's hands - and it is
/// never lost.
///
/// Locking: `inner` guards the eligible buffer, the counter and the
/// lifecycle; each task queue has its own lock. The scheduler acquires
/// queue locks while holding `inner`; submitters touch the two in separate
/// critical sections; workers touch only `inner`. There is no path that
/// acquires `inner` while holding a queue lock, so the order is acyclic.
#[derive(Debug)]
pub(crate) struct JobQueue {
    queues: [TaskQueue; TASK_CLASS_COUNT],
    inner: Mutex<Inner>,
    /// Signaled when eligible tasks appear; workers wait here.
    work_available: Condvar,
    /// Signaled when occupancy changes; the scheduler thread waits here.
    scheduler_wake: Condvar,
    /// Signaled when the outstanding-work counter reaches zero; `drain()`
    /// waits here.
    idle: Condvar,
    /// Signaled when a worker deregisters; shutdown's grace wait uses it.
    workers_changed: Condvar,
}

#[derive(Debug)]
struct Inner {
    output: VecDeque<RunnableTask>,
    /// Tasks submitted but not yet finished executing, regardless of where
    /// they currently sit.
    outstanding: usize,
    lifecycle: Lifecycle,
    reschedule: bool,
    registered_workers: usize,
}

impl JobQueue {
    pub(crate) fn new() -> Self {
        Self {
            queues: [
                // Index order must match `TaskClass::index`.
                TaskQueue::fifo(),
                TaskQueue::prioritized(),
                TaskQueue::fifo(),
            ],
            inner: Mutex::new(Inner {
                output: VecDeque::new(),
                outstanding: 0,
                lifecycle: Lifecycle::Open,
                reschedule: false,
                registered_workers: 0,
            }),
            work_available: Condvar::new(),
            scheduler_wake: Condvar::new(),
            idle: Condvar::new(),
            workers_changed: Condvar::new(),
        }
    }

    /// Routes one task into its class queue and notifies the scheduler.
    pub(crate) fn submit(
        &self,
        class: TaskClass,
        priority: Option<i64>,
        task: RunnableTask,
    ) -> Result<(), PoolError> {
        self.begin_submission(1)?;
        self.queues[class.index()].put(priority, task);
        self.notify_new_work();

        Ok(())
    }

    /// Routes a batch of same-class tasks in one queue operation.
    pub(crate) fn submit_batch(
        &self,
        class: TaskClass,
        tasks: Vec<(Option<i64>, RunnableTask)>,
    ) -> Result<usize, PoolError> {
        if tasks.is_empty() {
            return Ok(0);
        }

        let count = tasks.len();
        self.begin_submission(count)?;
        self.queues[class.index()].put_batch(tasks);
        self.notify_new_work();

        Ok(count)
    }

    /// Checks the lifecycle and raises the outstanding-work counter.
    ///
    /// The counter rises before the queue insertion so that a completion
    /// racing with the insertion can never drive it below zero.
    fn begin_submission(&self, count: usize) -> Result<(), PoolError> {
        let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);

        match inner.lifecycle {
            Lifecycle::Open => {
                inner.outstanding += count;
                Ok(())
            }
            Lifecycle::Closing => Err(PoolError::Closed),
            Lifecycle::Stopped => Err(PoolError::Stopped),
        }
    }

    fn notify_new_work(&self) {
        let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);
        inner.reschedule = true;
        drop(inner);

        self.scheduler_wake.notify_all();
    }

    /// The worker loop: wait for an eligible task, execute it, account for
    /// it, repeat until stopped.
    pub(crate) fn worker_loop(&self, token: &CancellationToken) {
        self.register_worker();

        while let Some(task) = self.next_task(token) {
            task.run();
            self.finish_task();
        }

        self.deregister_worker();
    }

    /// Blocks until an eligible task is available, a pause ends, or a stop
    /// is requested. Returns [`None`] on stop.
    fn next_task(&self, token: &CancellationToken) -> Option<RunnableTask> {
        let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);

        loop {
            if token.is_stop_requested() {
                return None;
            }

            if token.is_pause_requested() {
                // Paused workers park on the token, not on the work condvar,
                // so queued work is withheld without being dequeued.
                drop(inner);
                token.wait_until_resumed();
                inner = self.inner.lock().expect(ERR_POISONED_LOCK);
                continue;
            }

            if let Some(task) = inner.output.pop_front() {
                return Some(task);
            }

            inner = self.work_available.wait(inner).expect(ERR_POISONED_LOCK);
        }
    }

    fn finish_task(&self) {
        let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);
        inner.outstanding = inner.outstanding.saturating_sub(1);
        let drained = inner.outstanding == 0;
        // A slot in the eligible buffer freed up; give the scheduler a
        // chance to top it up.
        inner.reschedule = true;
        drop(inner);

        if drained {
            self.idle.notify_all();
        }
        self.scheduler_wake.notify_all();
    }

    /// The scheduling loop: once per tick (or sooner, when notified), let
    /// the strategy move tasks from the class queues into the eligible
    /// buffer.
    pub(crate) fn scheduler_loop(
        &self,
        token: &CancellationToken,
        policy: &mut dyn SchedulePolicy,
        worker_count: usize,
        load_factor: LoadFactor,
        tick: Duration,
    ) {
        loop {
            let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);

            if !inner.reschedule && !token.is_stop_requested() && !token.is_pause_requested() {
                let (guard, _timed_out) = self
                    .scheduler_wake
                    .wait_timeout(inner, tick)
                    .expect(ERR_POISONED_LOCK);
                inner = guard;
            }

            if token.is_stop_requested() {
                break;
            }

            if token.is_pause_requested() {
                drop(inner);
                token.wait_until_resumed();
                continue;
            }

            inner.reschedule = false;

            let stats = QueueStats {
                queue_lens: self.queues.iter().map(TaskQueue::len).collect(),
                output_len: inner.output.len(),
                worker_count,
                load_factor,
            };

            let moved = policy.apply(&stats, &self.queues, &mut inner.output);
            let drained = inner.outstanding == 0;
            drop(inner);

            if moved > 0 {
                self.work_available.notify_all();
            } else if drained {
                // Nothing to move and nothing outstanding: anyone blocked in
                // drain() must be released even though no worker will ever
                // deliver the zero-crossing signal.
                self.idle.notify_all();
            }
        }
    }

    /// Blocks until every task submitted before this call has finished
    /// executing.
    pub(crate) fn drain(&self) {
        let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);
        inner.reschedule = true;
        self.scheduler_wake.notify_all();

        while inner.outstanding > 0 {
            inner = self.idle.wait(inner).expect(ERR_POISONED_LOCK);
        }
    }

    /// Rejects new submissions; existing work continues to drain.
    pub(crate) fn close(&self) {
        let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);

        if inner.lifecycle == Lifecycle::Open {
            inner.lifecycle = Lifecycle::Closing;
            tracing::debug!("pool closed to new submissions");
        }
    }

    /// Stops the pool: propagates cancellation, waits up to `grace` for the
    /// workers to finish their in-flight tasks, then discards all queued
    /// work. Returns whether every worker exited within the grace period.
    pub(crate) fn stop(&self, token: &CancellationToken, grace: Duration) -> bool {
        {
            let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);

            if inner.lifecycle == Lifecycle::Stopped && inner.registered_workers == 0 {
                return true;
            }

            inner.lifecycle = Lifecycle::Stopped;
        }

        token.request_stop();
        self.wake_all();

        let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);
        let deadline = Instant::now() + grace;
        let mut clean = true;

        while inner.registered_workers > 0 {
            let now = Instant::now();

            if now >= deadline {
                clean = false;
                tracing::warn!(
                    workers = inner.registered_workers,
                    "shutdown grace period elapsed with workers still busy"
                );
                break;
            }

            let (guard, _timed_out) = self
                .workers_changed
                .wait_timeout(inner, deadline - now)
                .expect(ERR_POISONED_LOCK);
            inner = guard;
        }

        let mut discarded = inner.output.len();
        inner.output.clear();
        for queue in &self.queues {
            discarded += queue.clear();
        }

        if discarded > 0 {
            tracing::debug!(discarded, "queued tasks discarded on stop");
        }

        inner.outstanding = 0;
        drop(inner);

        // Release anyone blocked in drain(); there is nothing left to wait
        // for.
        self.idle.notify_all();

        clean
    }

    /// Wakes every thread blocked on any of the queue's condition
    /// variables so it re-checks the control flags.
    pub(crate) fn wake_all(&self) {
        self.work_available.notify_all();
        self.scheduler_wake.notify_all();
        self.workers_changed.notify_all();
    }

    /// Advisory count of submitted-but-unfinished tasks.
    pub(crate) fn size(&self) -> usize {
        self.inner.lock().expect(ERR_POISONED_LOCK).outstanding
    }

    fn register_worker(&self) {
        let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);
        inner.registered_workers += 1;
    }

    fn deregister_worker(&self) {
        let mut inner = self.inner.lock().expect(ERR_POISONED_LOCK);
        inner.registered_workers = inner.registered_workers.saturating_sub(1);
        drop(inner);

        self.workers_changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    fn counting_task(counter: &Arc<AtomicUsize>) -> RunnableTask {
        let counter = Arc::clone(counter);
        RunnableTask::new(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn submissions_raise_the_outstanding_counter() {
        let jobq = JobQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        jobq.submit(TaskClass::Immediate, None, counting_task(&counter))
            .unwrap();

        let batch = (0..9)
            .map(|_| (None, counting_task(&counter)))
            .collect::<Vec<_>>();
        assert_eq!(jobq.submit_batch(TaskClass::Immediate, batch).unwrap(), 9);

        assert_eq!(jobq.size(), 10);
    }

    #[test]
    fn closed_queue_rejects_submissions() {
        let jobq = JobQueue::new();
        jobq.close();

        let counter = Arc::new(AtomicUsize::new(0));
        let result = jobq.submit(TaskClass::Immediate, None, counting_task(&counter));

        assert_eq!(result, Err(PoolError::Closed));
        assert_eq!(jobq.size(), 0);
    }

    #[test]
    fn stopped_queue_rejects_submissions_distinctly() {
        let jobq = JobQueue::new();
        let token = CancellationToken::new();
        assert!(jobq.stop(&token, Duration::from_millis(10)));

        let counter = Arc::new(AtomicUsize::new(0));
        let result = jobq.submit(TaskClass::Immediate, None, counting_task(&counter));

        assert_eq!(result, Err(PoolError::Stopped));
    }

    #[test]
    fn stop_discards_queued_work_and_releases_drain() {
        let jobq = Arc::new(JobQueue::new());
        let token = CancellationToken::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            jobq.submit(TaskClass::Immediate, None, counting_task(&counter))
                .unwrap();
        }

        // No workers running: the tasks can never execute, so stop must
        // discard them and zero the counter.
        assert!(jobq.stop(&token, Duration::from_millis(10)));
        assert_eq!(jobq.size(), 0);

        // drain() must return promptly now.
        jobq.drain();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn worker_loop_executes_eligible_tasks() {
        let jobq = Arc::new(JobQueue::new());
        let token = CancellationToken::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..4 {
            jobq.submit(TaskClass::Immediate, None, counting_task(&counter))
                .unwrap();
        }

        // Move everything into the eligible buffer by hand; this test runs
        // without a scheduler thread.
        {
            let mut inner = jobq.inner.lock().unwrap();
            for queue in &jobq.queues {
                queue.pop_n(&mut inner.output, usize::MAX);
            }
        }
        jobq.work_available.notify_all();

        let worker = thread::spawn({
            let jobq = Arc::clone(&jobq);
            let token = token.clone();
            move || jobq.worker_loop(&token)
        });

        jobq.drain();
        assert_eq!(counter.load(Ordering::SeqCst), 4);

        token.request_stop();
        jobq.wake_all();
        worker.join().unwrap();
    }
}
