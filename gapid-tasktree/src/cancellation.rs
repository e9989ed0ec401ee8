//! An opaque, monotonic, thread-safe, forkable cancellation signal. Shaped like
//! `tokio_util::sync::CancellationToken`, but implemented locally on `parking_lot::Mutex` since
//! nothing else here needs a `tokio` runtime.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

struct State {
    cancelled: bool,
    deadline: Option<Instant>,
    waiters: Vec<Box<dyn FnOnce() + Send>>,
}

struct Shared {
    state: Mutex<State>,
}

/// A handle to a cancellation signal. Cloning shares the same underlying state; `child_token`
/// derives an independent token that is cancelled whenever its parent is, but can also be
/// cancelled (or given a tighter deadline) on its own without affecting the parent.
pub struct CancellationToken {
    shared: Arc<Shared>,
}

impl Clone for CancellationToken {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State { cancelled: false, deadline: None, waiters: Vec::new() }),
            }),
        }
    }

    /// Trips the token. Idempotent: cancelling an already-cancelled token is a no-op. Runs every
    /// registered one-shot waiter exactly once.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        if state.cancelled {
            return;
        }
        state.cancelled = true;
        let waiters = std::mem::take(&mut state.waiters);
        drop(state);
        for waiter in waiters {
            waiter();
        }
    }

    /// True if `cancel` was called, or if a deadline set via [`Self::with_deadline`] has passed.
    /// Deadlines are polled, not pushed — callers are expected to consult this at I/O boundaries
    /// and loop heads, per the cancellation contract.
    pub fn is_cancelled(&self) -> bool {
        let state = self.shared.state.lock();
        state.cancelled || state.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.shared.state.lock().deadline
    }

    /// Registers a one-shot callback run the moment this token is cancelled. Runs immediately,
    /// inline, if the token is already cancelled.
    pub fn on_cancelled(&self, f: impl FnOnce() + Send + 'static) {
        let mut state = self.shared.state.lock();
        if state.cancelled {
            drop(state);
            f();
        } else {
            state.waiters.push(Box::new(f));
        }
    }

    /// Derives an independent token cancelled whenever `self` is. Cancelling the child does not
    /// cancel `self`.
    pub fn child_token(&self) -> CancellationToken {
        let child = CancellationToken::new();
        if self.is_cancelled() {
            child.cancel();
        } else {
            let propagate = child.clone();
            self.on_cancelled(move || propagate.cancel());
        }
        child
    }

    /// Derives a child token that is also cancelled once `deadline` passes (checked lazily by
    /// [`Self::is_cancelled`], not by a background timer).
    pub fn with_deadline(&self, deadline: Instant) -> CancellationToken {
        let child = self.child_token();
        child.shared.state.lock().deadline = Some(deadline);
        child
    }
}
