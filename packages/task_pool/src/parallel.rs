//! Data-parallel algorithms built on the scheduling primitives.
//!
//! Every algorithm here decomposes its input into independent sub-tasks,
//! submits them through the job queue like any other task, and blocks until
//! all of them have completed before returning. That barrier is also the
//! lifetime contract: because an algorithm never returns while one of its
//! sub-tasks can still run, the sub-task closures may borrow the caller's
//! data even though the worker threads demand `'static` closures.

use std::any::Any;
use std::cmp::Ordering;
use std::mem;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use crate::PoolError;
use crate::job_queue::JobQueue;
use crate::partition::Partitioner;
use crate::task::{RunnableTask, TaskClass};

type PanicPayload = Box<dyn Any + Send + 'static>;

/// Completion handle for one scoped sub-task.
struct ScopedFuture<R> {
    receiver: oneshot::Receiver<Result<R, PanicPayload>>,
}

enum ScopedOutcome<R> {
    Done(R),
    Panicked(PanicPayload),
    /// The task was discarded without running; only a concurrent stop of
    /// the pool does this.
    Discarded,
}

impl<R> ScopedFuture<R> {
    /// Blocks until the sub-task has run, panicked, or been discarded.
    fn wait(self) -> ScopedOutcome<R> {
        match self.receiver.recv() {
            Ok(Ok(value)) => ScopedOutcome::Done(value),
            Ok(Err(payload)) => ScopedOutcome::Panicked(payload),
            Err(_) => ScopedOutcome::Discarded,
        }
    }
}

/// Submits one borrowing sub-task for execution.
fn submit_scoped<'env, R>(
    jobq: &JobQueue,
    job: Box<dyn FnOnce() -> R + Send + 'env>,
) -> Result<ScopedFuture<R>, PoolError>
where
    R: Send + 'env,
{
    let (sender, receiver) = oneshot::channel();

    let work: Box<dyn FnOnce() + Send + 'env> = Box::new(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(job));

        // Delivery fails only when the submitting algorithm is already
        // unwinding and dropped its receivers; the result is then unwanted.
        drop(sender.send(outcome));
    });

    // Since every algorithm waits for all of its sub-task futures before
    // returning, the closure does not actually outlive 'env - the type
    // system just requires 'static because Rust has no compiler-enforced
    // way to prove that we wait for the work to complete.
    //
    // SAFETY: This is valid because functionally it is still 'env: the
    // submitting algorithm blocks on every sub-task's receiver (which
    // resolves once the closure has run or been dropped) before its borrows
    // go out of scope, so everything the closure borrows stays borrowed for
    // as long as the closure exists.
    let work = unsafe {
        mem::transmute::<Box<dyn FnOnce() + Send + 'env>, Box<dyn FnOnce() + Send + 'static>>(work)
    };

    jobq.submit(TaskClass::Immediate, None, RunnableTask::new(work))?;

    Ok(ScopedFuture { receiver })
}

/// Submits a batch of borrowing sub-tasks and waits for all of them.
///
/// Results are returned in submission order. A panic in any sub-task is
/// re-raised on the calling thread once every sub-task has settled - the
/// settling is not optional, it is what keeps the borrows sound.
fn run_batch<'env, R>(
    jobq: &JobQueue,
    jobs: Vec<Box<dyn FnOnce() -> R + Send + 'env>>,
) -> Result<Vec<R>, PoolError>
where
    R: Send + 'env,
{
    let mut futures = Vec::with_capacity(jobs.len());
    let mut submit_error = None;

    for job in jobs {
        match submit_scoped(jobq, job) {
            Ok(future) => futures.push(future),
            Err(error) => {
                // Submission failures drop the closure immediately; only
                // the already-submitted sub-tasks still need settling.
                submit_error = Some(error);
                break;
            }
        }
    }

    let mut results = Vec::with_capacity(futures.len());
    let mut panic_payload: Option<PanicPayload> = None;
    let mut discarded = false;

    for future in futures {
        match future.wait() {
            ScopedOutcome::Done(value) => results.push(value),
            ScopedOutcome::Panicked(payload) => {
                if panic_payload.is_none() {
                    panic_payload = Some(payload);
                }
            }
            ScopedOutcome::Discarded => discarded = true,
        }
    }

    // Every sub-task has settled; borrows are released and it is safe to
    // leave by any path.
    if let Some(payload) = panic_payload {
        panic::resume_unwind(payload);
    }

    if let Some(error) = submit_error {
        return Err(error);
    }

    if discarded {
        return Err(PoolError::Stopped);
    }

    Ok(results)
}

/// Schedules one task per element and waits for all of them.
pub(crate) fn for_each<T, F>(jobq: &JobQueue, items: &[T], action: &F) -> Result<(), PoolError>
where
    T: Sync,
    F: Fn(&T) + Sync,
{
    let jobs = items
        .iter()
        .map(|item| Box::new(move || action(item)) as Box<dyn FnOnce() + Send + '_>)
        .collect();

    run_batch(jobq, jobs).map(|_| ())
}

/// Transform-reduce over `items`: one local fold per partition, then a join
/// fold of the partial results.
///
/// Partial results are folded in fixed partition order, so an associative
/// but non-commutative operator still yields a deterministic result. `init`
/// seeds every partition as well as the join, so it must be the identity of
/// `reduce_op` for the result to equal the sequential fold.
pub(crate) fn transform_reduce<T, A, R, U>(
    jobq: &JobQueue,
    items: &[T],
    init: A,
    reduce_op: &R,
    transform: &U,
    partitioner: Partitioner,
) -> Result<A, PoolError>
where
    T: Sync,
    A: Send + Clone,
    R: Fn(A, A) -> A + Sync,
    U: Fn(&T) -> A + Sync,
{
    let jobs = partitioner
        .split(items.len())
        .map(|range| {
            let seed = init.clone();

            Box::new(move || {
                items[range]
                    .iter()
                    .fold(seed, |accumulator, item| {
                        reduce_op(accumulator, transform(item))
                    })
            }) as Box<dyn FnOnce() -> A + Send + '_>
        })
        .collect::<Vec<_>>();

    if jobs.is_empty() {
        return Ok(init);
    }

    let partials = run_batch(jobq, jobs)?;

    Ok(partials
        .into_iter()
        .fold(init, |accumulator, partial| reduce_op(accumulator, partial)))
}

/// Task-parallel merge sort.
///
/// Short inputs are sorted sequentially in place. Longer inputs are split
/// into chunks (one sequential sort task per chunk), after which adjacent
/// sorted ranges are repeatedly paired and merged in place, one task per
/// pair, level by level. Every level is a barrier: merging a pair is only
/// valid once both of its sides are themselves sorted, so level `L + 1`
/// never starts before every merge of level `L` has completed. An odd range
/// at any level carries over to the next level unmerged.
pub(crate) fn sort_by<T, F>(
    jobq: &JobQueue,
    items: &mut [T],
    compare: &F,
    worker_count: usize,
    cutoff: usize,
) -> Result<(), PoolError>
where
    T: Send,
    F: Fn(&T, &T) -> Ordering + Sync,
{
    let len = items.len();

    if len <= cutoff {
        items.sort_by(|a, b| compare(a, b));
        return Ok(());
    }

    let step = (len / worker_count.max(1)).clamp(2, cutoff);
    let ranges = chunk_ranges(len, step);

    // Level 0: sort each chunk independently.
    {
        let mut rest = &mut *items;
        let mut jobs = Vec::with_capacity(ranges.len());

        for range in &ranges {
            let chunk = split_off_mut(&mut rest, range.len());
            jobs.push(Box::new(move || chunk.sort_by(|a, b| compare(a, b)))
                as Box<dyn FnOnce() + Send + '_>);
        }

        run_batch(jobq, jobs)?;
    }

    // Reduction tree: pair adjacent sorted ranges and merge each pair.
    let mut ranges = ranges;

    while ranges.len() > 1 {
        let mut next_ranges = Vec::with_capacity(ranges.len().div_ceil(2));
        let mut jobs = Vec::new();
        let mut rest = &mut *items;

        for pair in ranges.chunks(2) {
            match pair {
                [left, right] => {
                    let span = left.start..right.end;
                    let mid = left.len();
                    let segment = split_off_mut(&mut rest, span.len());

                    jobs.push(Box::new(move || merge_adjacent(segment, mid, compare))
                        as Box<dyn FnOnce() + Send + '_>);
                    next_ranges.push(span);
                }
                [only] => {
                    // The odd range out; carried to the next level unmerged.
                    let _skipped = split_off_mut(&mut rest, only.len());
                    next_ranges.push(only.clone());
                }
                _ => unreachable!("chunks(2) yields one or two ranges"),
            }
        }

        run_batch(jobq, jobs)?;
        ranges = next_ranges;
    }

    Ok(())
}

fn chunk_ranges(len: usize, step: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::with_capacity(len.div_ceil(step));
    let mut start = 0;

    while start < len {
        let end = (start + step).min(len);
        ranges.push(start..end);
        start = end;
    }

    ranges
}

/// Splits `count` elements off the front of `*rest`, keeping the original
/// lifetime on both halves.
fn split_off_mut<'a, T>(rest: &mut &'a mut [T], count: usize) -> &'a mut [T] {
    let slice = mem::take(rest);
    let (head, tail) = slice.split_at_mut(count);
    *rest = tail;
    head
}

/// Merges the two adjacent sorted runs `slice[..mid]` and `slice[mid..]`
/// into one sorted run, in place.
///
/// Uses a scratch buffer holding the left run. The merge is stable: equal
/// elements keep left-run-first order.
fn merge_adjacent<T, F>(slice: &mut [T], mid: usize, compare: &F)
where
    F: Fn(&T, &T) -> Ordering,
{
    let len = slice.len();

    if mid == 0 || mid >= len {
        return;
    }

    // Already in order; nothing to do. This is the common case once the
    // input has large sorted stretches.
    if compare(&slice[mid - 1], &slice[mid]) != Ordering::Greater {
        return;
    }

    let mut scratch = Vec::<T>::with_capacity(mid);
    let base = slice.as_mut_ptr();

    // The merge works on raw copies: the left run is copied out into the
    // scratch buffer (which never has its length set, so it will not drop
    // anything), and elements are copied back into the slice one at a time.
    // The guard owns the unconsumed scratch elements; if the comparator
    // panics, its Drop copies them back so every slot of the slice holds an
    // initialized element exactly once.
    //
    // SAFETY: `scratch` has capacity for `mid` elements; `base` points at
    // least `len` elements; `mid < len` was checked above. The pointer
    // arithmetic below never leaves those bounds: `guard.src..guard.end`
    // walks the scratch buffer, `right` walks `base + mid .. base + len`,
    // and `guard.dest` advances once per element copied in, which happens
    // exactly `len` times in total across loop and guard.
    unsafe {
        let buf = scratch.as_mut_ptr();
        ptr::copy_nonoverlapping(base, buf, mid);

        let mut guard = MergeGuard {
            src: buf,
            end: buf.add(mid),
            dest: base,
        };
        let mut right = base.add(mid);
        let right_end = base.add(len);

        while guard.src < guard.end && right < right_end {
            // `<` keeps the merge stable: on ties the left run goes first.
            if compare(&*right, &*guard.src) == Ordering::Less {
                ptr::copy_nonoverlapping(right, guard.dest, 1);
                right = right.add(1);
            } else {
                ptr::copy_nonoverlapping(guard.src, guard.dest, 1);
                guard.src = guard.src.add(1);
            }

            guard.dest = guard.dest.add(1);
        }

        // The guard's Drop moves any unconsumed left-run elements into
        // place. Unconsumed right-run elements are already in place.
    }
}

/// Owns the unconsumed left-run elements during a merge; on drop (normal or
/// unwinding) it moves them into the destination hole.
struct MergeGuard<T> {
    src: *mut T,
    end: *mut T,
    dest: *mut T,
}

impl<T> Drop for MergeGuard<T> {
    fn drop(&mut self) {
        // SAFETY: `src..end` holds initialized elements owned by the guard,
        // and the destination hole has room for exactly that many elements
        // (every slice slot before `dest` was filled from one of the runs,
        // and the remaining right-run elements sit exactly after the hole).
        unsafe {
            let remaining = self.end.offset_from(self.src) as usize;
            ptr::copy_nonoverlapping(self.src, self.dest, remaining);
        }
    }
}
