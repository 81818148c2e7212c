use std::sync::{Arc, Condvar, Mutex};

use crate::constants::ERR_POISONED_LOCK;

/// A cloneable stop/pause source observed cooperatively by the pool's
/// threads.
///
/// Clones share state. Stop is irreversible: once requested it stays
/// requested for the lifetime of the token. Pause is reversible and may be
/// requested and cleared any number of times; a stop request overrides any
/// pause in progress.
///
/// # Example
///
/// ```
/// use task_pool::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
///
/// token.request_pause();
/// assert!(observer.is_pause_requested());
///
/// token.request_resume();
/// token.request_stop();
/// assert!(observer.is_stop_requested());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<ControlState>,
    resumed: Condvar,
}

#[derive(Debug, Default)]
struct ControlState {
    stop_requested: bool,
    pause_requested: bool,
}

impl CancellationToken {
    /// Creates a token in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that all observers stop.
    ///
    /// Irreversible. Returns whether this call performed the transition
    /// (`false` when stop had already been requested).
    pub fn request_stop(&self) -> bool {
        let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);
        let transitioned = !state.stop_requested;
        state.stop_requested = true;
        drop(state);

        // Threads parked in a pause must re-check and observe the stop.
        self.shared.resumed.notify_all();

        transitioned
    }

    /// Returns whether a stop has been requested.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.shared
            .state
            .lock()
            .expect(ERR_POISONED_LOCK)
            .stop_requested
    }

    /// Requests that all observers pause.
    ///
    /// Pausing withholds execution; it does not discard queued work.
    pub fn request_pause(&self) {
        self.shared
            .state
            .lock()
            .expect(ERR_POISONED_LOCK)
            .pause_requested = true;
    }

    /// Clears a pause request, waking every thread parked in
    /// [`wait_until_resumed()`][Self::wait_until_resumed].
    pub fn request_resume(&self) {
        let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);
        state.pause_requested = false;
        drop(state);

        self.shared.resumed.notify_all();
    }

    /// Returns whether a pause is currently requested.
    #[must_use]
    pub fn is_pause_requested(&self) -> bool {
        self.shared
            .state
            .lock()
            .expect(ERR_POISONED_LOCK)
            .pause_requested
    }

    /// Blocks the calling thread while a pause is in effect.
    ///
    /// Returns immediately if no pause is requested. A stop request also
    /// releases the wait, since stopped observers must get a chance to exit.
    pub fn wait_until_resumed(&self) {
        let mut state = self.shared.state.lock().expect(ERR_POISONED_LOCK);

        while state.pause_requested && !state.stop_requested {
            state = self.shared.resumed.wait(state).expect(ERR_POISONED_LOCK);
        }
    }
}
