use std::{io, mem, ptr};

use crate::{Error, Result, SchedulingPolicy, ThreadOptions};

fn policy_to_os(policy: SchedulingPolicy) -> libc::c_int {
    match policy {
        SchedulingPolicy::Standard => libc::SCHED_OTHER,
        SchedulingPolicy::Fifo => libc::SCHED_FIFO,
        SchedulingPolicy::RoundRobin => libc::SCHED_RR,
        SchedulingPolicy::Batch => libc::SCHED_BATCH,
        SchedulingPolicy::Idle => libc::SCHED_IDLE,
    }
}

fn policy_from_os(policy: libc::c_int) -> SchedulingPolicy {
    match policy {
        libc::SCHED_FIFO => SchedulingPolicy::Fifo,
        libc::SCHED_RR => SchedulingPolicy::RoundRobin,
        libc::SCHED_BATCH => SchedulingPolicy::Batch,
        libc::SCHED_IDLE => SchedulingPolicy::Idle,
        _ => SchedulingPolicy::Standard,
    }
}

/// Reads the scheduling policy and priority of the calling thread.
fn current_sched_param() -> Result<(libc::c_int, libc::sched_param)> {
    let mut policy: libc::c_int = 0;

    // SAFETY: All zeroes is a valid sched_param.
    let mut param: libc::sched_param = unsafe { mem::zeroed() };

    // SAFETY: No safety requirements beyond passing valid pointers.
    let result =
        unsafe { libc::pthread_getschedparam(libc::pthread_self(), &raw mut policy, &raw mut param) };

    if result == 0 {
        Ok((policy, param))
    } else {
        Err(Error::Os {
            operation: "pthread_getschedparam",
            source: io::Error::from_raw_os_error(result),
        })
    }
}

fn set_sched_param(policy: libc::c_int, param: &libc::sched_param) -> Result<()> {
    // SAFETY: No safety requirements beyond passing valid pointers.
    let result = unsafe { libc::pthread_setschedparam(libc::pthread_self(), policy, param) };

    if result == 0 {
        Ok(())
    } else {
        Err(Error::Os {
            operation: "pthread_setschedparam",
            source: io::Error::from_raw_os_error(result),
        })
    }
}

fn apply_affinity(processors: &[usize]) -> Result<()> {
    // SAFETY: All zeroes is a valid cpu_set_t.
    let mut cpuset: libc::cpu_set_t = unsafe { mem::zeroed() };

    for &processor in processors {
        // SAFETY: CPU_SET tolerates any index; out-of-range indexes are
        // ignored and surface as an error from sched_setaffinity below.
        unsafe {
            libc::CPU_SET(processor, &mut cpuset);
        }
    }

    // 0 means current thread.
    // SAFETY: No safety requirements beyond passing valid arguments.
    let result = unsafe { libc::sched_setaffinity(0, size_of::<libc::cpu_set_t>(), &raw const cpuset) };

    if result == 0 {
        Ok(())
    } else {
        Err(Error::Os {
            operation: "sched_setaffinity",
            source: io::Error::last_os_error(),
        })
    }
}

fn apply_signal_unblock(signals: &[i32]) -> Result<()> {
    // SAFETY: All zeroes is a valid sigset_t for sigemptyset to initialize.
    let mut sigset: libc::sigset_t = unsafe { mem::zeroed() };

    // SAFETY: No safety requirements beyond passing a valid pointer.
    unsafe {
        libc::sigemptyset(&raw mut sigset);
    }

    for &signal in signals {
        // SAFETY: No safety requirements beyond passing a valid pointer;
        // invalid signal numbers are reported via the return value.
        let result = unsafe { libc::sigaddset(&raw mut sigset, signal) };

        if result != 0 {
            return Err(Error::Os {
                operation: "sigaddset",
                source: io::Error::last_os_error(),
            });
        }
    }

    // SAFETY: No safety requirements beyond passing valid pointers.
    let result =
        unsafe { libc::pthread_sigmask(libc::SIG_UNBLOCK, &raw const sigset, ptr::null_mut()) };

    if result == 0 {
        Ok(())
    } else {
        Err(Error::Os {
            operation: "pthread_sigmask",
            source: io::Error::from_raw_os_error(result),
        })
    }
}

pub(crate) fn apply(options: &ThreadOptions) -> Result<()> {
    if options.policy.is_some() || options.priority.is_some() {
        let (current_policy, mut param) = current_sched_param()?;

        let policy = options.policy.map_or(current_policy, policy_to_os);

        if let Some(priority) = options.priority {
            param.sched_priority = priority;
        } else if options.policy.is_some() {
            // Changing policy resets the priority to the lowest valid value
            // for that policy, which is 0 for all non-real-time policies.
            // SAFETY: No safety requirements.
            param.sched_priority = unsafe { libc::sched_get_priority_min(policy) }.max(0);
        }

        set_sched_param(policy, &param)?;
    }

    if let Some(processors) = &options.affinity {
        apply_affinity(processors)?;
    }

    if let Some(signals) = &options.unblock_signals {
        apply_signal_unblock(signals)?;
    }

    Ok(())
}

pub(crate) fn retrieve() -> Result<ThreadOptions> {
    let (policy, param) = current_sched_param()?;

    // SAFETY: All zeroes is a valid cpu_set_t.
    let mut cpuset: libc::cpu_set_t = unsafe { mem::zeroed() };

    // 0 means current thread.
    // SAFETY: No safety requirements beyond passing valid arguments.
    let result = unsafe { libc::sched_getaffinity(0, size_of::<libc::cpu_set_t>(), &raw mut cpuset) };

    if result != 0 {
        return Err(Error::Os {
            operation: "sched_getaffinity",
            source: io::Error::last_os_error(),
        });
    }

    let processors = (0..libc::CPU_SETSIZE as usize)
        .filter(|&processor| {
            // SAFETY: No safety requirements beyond passing valid arguments.
            unsafe { libc::CPU_ISSET(processor, &cpuset) }
        })
        .collect::<Vec<_>>();

    Ok(ThreadOptions::new()
        .with_policy(policy_from_os(policy))
        .with_priority(param.sched_priority)
        .with_affinity(processors))
}

pub(crate) fn cancel() -> Result<()> {
    // SAFETY: All zeroes is a valid sched_param, and priority 0 is the only
    // valid priority for SCHED_OTHER.
    let param: libc::sched_param = unsafe { mem::zeroed() };

    set_sched_param(libc::SCHED_OTHER, &param)
}
