use crate::{Result, sys};

/// The OS scheduling policy a thread can request.
///
/// The variants map to the policies exposed by the platform scheduler. Which
/// of them are honored, and with what privileges, is up to the operating
/// system.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum SchedulingPolicy {
    /// The standard time-sharing policy; the platform default.
    Standard,

    /// First-in first-out real-time policy.
    Fifo,

    /// Round-robin real-time policy.
    RoundRobin,

    /// Policy for batch-style, throughput-oriented workloads.
    Batch,

    /// Policy for very low priority background work.
    Idle,
}

/// A set of OS-level configuration hints for a thread.
///
/// An empty set of options is valid and applying it does nothing. Options are
/// accumulated with the `with_*` builder methods and take effect via
/// [`apply()`][Self::apply], which always operates on the calling thread.
///
/// # Example
///
/// ```
/// use thread_config::{SchedulingPolicy, ThreadOptions};
///
/// let options = ThreadOptions::new()
///     .with_policy(SchedulingPolicy::Batch)
///     .with_priority(0)
///     .with_affinity([0]);
///
/// // Apply from the thread that should be affected. Errors are hints only.
/// drop(options.apply());
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ThreadOptions {
    pub(crate) priority: Option<i32>,
    pub(crate) policy: Option<SchedulingPolicy>,
    pub(crate) affinity: Option<Vec<usize>>,
    pub(crate) unblock_signals: Option<Vec<i32>>,
}

impl ThreadOptions {
    /// Creates an empty set of options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether no configuration has been requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.priority.is_none()
            && self.policy.is_none()
            && self.affinity.is_none()
            && self.unblock_signals.is_none()
    }

    /// Requests a scheduling priority.
    ///
    /// The meaningful range depends on the scheduling policy; for real-time
    /// policies it is typically 1..=99, for time-sharing policies only 0 is
    /// accepted.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Requests a scheduling policy.
    #[must_use]
    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Requests that the thread only runs on the given processors.
    ///
    /// Processor indexes are zero-based OS indexes. An empty set is ignored.
    #[must_use]
    pub fn with_affinity(mut self, processors: impl IntoIterator<Item = usize>) -> Self {
        let processors = processors.into_iter().collect::<Vec<_>>();
        self.affinity = if processors.is_empty() {
            None
        } else {
            Some(processors)
        };
        self
    }

    /// Requests that the given signals are unblocked for the thread.
    ///
    /// Signals are raw OS signal numbers. An empty set is ignored.
    #[must_use]
    pub fn with_unblocked_signals(mut self, signals: impl IntoIterator<Item = i32>) -> Self {
        let signals = signals.into_iter().collect::<Vec<_>>();
        self.unblock_signals = if signals.is_empty() {
            None
        } else {
            Some(signals)
        };
        self
    }

    /// Returns the requested priority, if any.
    #[must_use]
    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    /// Returns the requested scheduling policy, if any.
    #[must_use]
    pub fn policy(&self) -> Option<SchedulingPolicy> {
        self.policy
    }

    /// Returns the requested processor affinity, if any.
    #[must_use]
    pub fn affinity(&self) -> Option<&[usize]> {
        self.affinity.as_deref()
    }

    /// Returns the requested signal-unblock set, if any.
    #[must_use]
    pub fn unblocked_signals(&self) -> Option<&[i32]> {
        self.unblock_signals.as_deref()
    }

    /// Applies the options to the calling thread.
    ///
    /// Applies each requested aspect in turn and stops at the first failure.
    /// Aspects applied before the failure stay in effect. An empty option set
    /// succeeds without doing anything.
    ///
    /// # Errors
    ///
    /// [`Error::Os`][crate::Error::Os] when the operating system rejects a
    /// request, [`Error::Unsupported`][crate::Error::Unsupported] on
    /// platforms without an implementation.
    pub fn apply(&self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        sys::apply(self)
    }

    /// Retrieves the configuration currently in effect for the calling
    /// thread.
    ///
    /// The returned value contains the current scheduling policy, priority
    /// and affinity set; the signal-unblock set is not reported.
    ///
    /// # Errors
    ///
    /// [`Error::Os`][crate::Error::Os] when the operating system rejects a
    /// request, [`Error::Unsupported`][crate::Error::Unsupported] on
    /// platforms without an implementation.
    pub fn retrieve() -> Result<Self> {
        sys::retrieve()
    }

    /// Cancels any configuration previously applied to the calling thread,
    /// restoring the platform default scheduling policy and priority.
    ///
    /// The affinity set is not restored; retrieve it up front if you need to
    /// put it back.
    ///
    /// # Errors
    ///
    /// [`Error::Os`][crate::Error::Os] when the operating system rejects a
    /// request, [`Error::Unsupported`][crate::Error::Unsupported] on
    /// platforms without an implementation.
    pub fn cancel() -> Result<()> {
        sys::cancel()
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ThreadOptions: Send, Sync, Debug, Clone);

    #[test]
    fn empty_options_are_empty() {
        assert!(ThreadOptions::new().is_empty());
        assert!(!ThreadOptions::new().with_priority(0).is_empty());
    }

    #[test]
    fn empty_collections_are_ignored() {
        let options = ThreadOptions::new()
            .with_affinity([])
            .with_unblocked_signals([]);

        assert!(options.is_empty());
    }

    #[test]
    fn builder_accumulates() {
        let options = ThreadOptions::new()
            .with_policy(SchedulingPolicy::Batch)
            .with_priority(0)
            .with_affinity([0, 2]);

        assert_eq!(options.policy(), Some(SchedulingPolicy::Batch));
        assert_eq!(options.priority(), Some(0));
        assert_eq!(options.affinity(), Some([0, 2].as_slice()));
        assert_eq!(options.unblocked_signals(), None);
    }

    #[test]
    fn applying_empty_options_succeeds_everywhere() {
        ThreadOptions::new().apply().unwrap();
    }
}
