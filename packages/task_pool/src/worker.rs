use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thread_config::ThreadOptions;

use crate::cancellation::CancellationToken;
use crate::config::PoolConfig;
use crate::job_queue::JobQueue;
use crate::scheduler::policy_for;

/// Owns the pool's OS threads: the workers and the scheduler thread.
#[derive(Debug)]
pub(crate) struct WorkerPool {
    worker_handles: Vec<JoinHandle<()>>,
    scheduler_handle: Option<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns one worker thread per configured slot plus the scheduler
    /// thread. Every thread gets a clone of the cancellation token and has
    /// the configured OS-level thread options applied (failures there are
    /// logged and ignored - they are hints, not requirements).
    pub(crate) fn start(
        jobq: &Arc<JobQueue>,
        config: &PoolConfig,
        token: &CancellationToken,
    ) -> Self {
        let worker_count = config.worker_count().get();
        let mut worker_handles = Vec::with_capacity(worker_count);

        for index in 0..worker_count {
            let jobq = Arc::clone(jobq);
            let token = token.clone();
            let options = config.thread_options().clone();

            let handle = thread::Builder::new()
                .name(format!("pool-worker-{index}"))
                .spawn(move || {
                    apply_thread_options(&options);
                    jobq.worker_loop(&token);
                })
                .expect("spawning a pool worker thread failed");

            worker_handles.push(handle);
        }

        let scheduler_handle = {
            let jobq = Arc::clone(jobq);
            let token = token.clone();
            let mut policy = policy_for(config.strategy());
            let load_factor = config.load_factor();
            let tick = config.scheduler_tick();

            thread::Builder::new()
                .name("pool-scheduler".to_string())
                .spawn(move || {
                    jobq.scheduler_loop(&token, policy.as_mut(), worker_count, load_factor, tick);
                })
                .expect("spawning the pool scheduler thread failed")
        };

        tracing::debug!(workers = worker_count, "task pool threads started");

        Self {
            worker_handles,
            scheduler_handle: Some(scheduler_handle),
        }
    }

    /// Joins the pool's threads after a stop request.
    ///
    /// `workers_exited` reports whether the shutdown grace period saw every
    /// worker deregister. Workers that are still busy past the grace period
    /// are detached rather than joined; we never force-kill an OS thread,
    /// and the cancellation token guarantees that a well-behaved task lets
    /// its worker exit eventually.
    #[cfg_attr(test, mutants::skip)] // Join behavior only shows up as a hang when broken.
    pub(crate) fn join(&mut self, workers_exited: bool) {
        if let Some(handle) = self.scheduler_handle.take() {
            // The scheduler never runs user code, so it observes the stop
            // request promptly and is always safe to join.
            if handle.join().is_err() {
                tracing::error!("scheduler thread panicked");
            }
        }

        for handle in self.worker_handles.drain(..) {
            if workers_exited || handle.is_finished() {
                if handle.join().is_err() {
                    tracing::error!("worker thread panicked");
                }
            } else {
                tracing::warn!("detaching worker that outlived the shutdown grace period");
                drop(handle);
            }
        }
    }
}

fn apply_thread_options(options: &ThreadOptions) {
    if let Err(error) = options.apply() {
        tracing::warn!(%error, "worker thread configuration not applied");
    }
}
