//! Deadline scope state shared between the scope owner and the enclosed work.

use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use super::error::Cancelled;

/// Lifecycle of a deadline scope.
///
/// `Pending` moves to exactly one of the two terminal states; any later
/// transition request is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Pending,
    /// The deadline elapsed and cancellation was delivered.
    Fired,
    /// The scope exited before the deadline; the timer is disarmed.
    Cleared,
}

struct Shared {
    budget: Duration,
    /// `None` when the budget is zero: the scope never fires.
    expires_at: Option<Instant>,
    state: Mutex<ScopeState>,
    wake: Condvar,
}

/// Handle to an active deadline scope.
///
/// Clones share the same scope. Code running inside a scope uses the handle
/// to observe cancellation at its own checkpoints.
#[derive(Clone)]
pub struct Deadline {
    inner: Arc<Shared>,
}

thread_local! {
    static CURRENT: RefCell<Option<Deadline>> = const { RefCell::new(None) };
}

impl Deadline {
    pub(crate) fn arm(budget: Duration) -> Self {
        let expires_at = if budget.is_zero() {
            None
        } else {
            Instant::now().checked_add(budget)
        };
        Self {
            inner: Arc::new(Shared {
                budget,
                expires_at,
                state: Mutex::new(ScopeState::Pending),
                wake: Condvar::new(),
            }),
        }
    }

    /// The blocking deadline active on the current thread, if any.
    ///
    /// Lets zero-argument operations running under a blocking scope (directly
    /// or through a retry policy with a timeout) check for cancellation.
    pub fn current() -> Option<Deadline> {
        CURRENT.with(|current| current.borrow().clone())
    }

    pub(crate) fn is_active_on_thread() -> bool {
        CURRENT.with(|current| current.borrow().is_some())
    }

    /// Mark this scope as the active blocking deadline of the current thread
    /// until the returned guard is dropped.
    pub(crate) fn enter(&self) -> EnteredScope {
        CURRENT.with(|current| *current.borrow_mut() = Some(self.clone()));
        EnteredScope { _private: () }
    }

    pub fn budget(&self) -> Duration {
        self.inner.budget
    }

    pub(crate) fn is_unbounded(&self) -> bool {
        self.inner.expires_at.is_none()
    }

    pub fn state(&self) -> ScopeState {
        *self.lock()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == ScopeState::Fired
    }

    /// Time left before the deadline; `None` for a scope without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        let expires_at = self.inner.expires_at?;
        if self.is_cancelled() {
            return Some(Duration::ZERO);
        }
        Some(expires_at.saturating_duration_since(Instant::now()))
    }

    /// Returns `Err(Cancelled)` once the scope has fired. A pending scope
    /// past its deadline fires here.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        self.expire_if_due();
        if self.is_cancelled() {
            Err(self.cancelled())
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, waking early with `Err(Cancelled)` if the scope
    /// fires. A zero duration yields the thread once.
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        if duration.is_zero() {
            self.checkpoint()?;
            thread::yield_now();
            return self.checkpoint();
        }
        let wake_at = Instant::now().checked_add(duration);
        let mut state = self.lock();
        loop {
            let now = Instant::now();
            if *state == ScopeState::Pending && self.is_due(now) {
                *state = ScopeState::Fired;
                self.inner.wake.notify_all();
            }
            if *state == ScopeState::Fired {
                return Err(self.cancelled());
            }
            if wake_at.is_some_and(|at| now >= at) {
                return Ok(());
            }
            // Wake at the end of the sleep or, while pending, at the deadline.
            let expiry = self
                .inner
                .expires_at
                .filter(|_| *state == ScopeState::Pending);
            let until = match (wake_at, expiry) {
                (Some(w), Some(e)) => Some(w.min(e)),
                (w, e) => w.or(e),
            };
            state = match until {
                Some(until) => {
                    self.inner
                        .wake
                        .wait_timeout(state, until.saturating_duration_since(now))
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .inner
                    .wake
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    /// `Pending -> Fired`. Returns false if the scope already left `Pending`.
    pub(crate) fn fire(&self) -> bool {
        let fired = self.transition(ScopeState::Fired);
        if fired {
            self.inner.wake.notify_all();
        }
        fired
    }

    /// Fire a pending scope whose deadline has passed.
    pub(crate) fn expire_if_due(&self) -> bool {
        self.is_due(Instant::now()) && self.fire()
    }

    fn is_due(&self, now: Instant) -> bool {
        self.inner.expires_at.is_some_and(|at| now >= at)
    }

    /// `Pending -> Cleared`. Returns false if the scope already left `Pending`.
    pub(crate) fn clear(&self) -> bool {
        self.transition(ScopeState::Cleared)
    }

    pub(crate) fn cancelled(&self) -> Cancelled {
        Cancelled::new(self.inner.budget)
    }

    fn transition(&self, to: ScopeState) -> bool {
        let mut state = self.lock();
        if *state != ScopeState::Pending {
            return false;
        }
        *state = to;
        true
    }

    fn lock(&self) -> MutexGuard<'_, ScopeState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deadline")
            .field("budget", &self.inner.budget)
            .field("remaining", &self.remaining())
            .field("state", &self.state())
            .finish()
    }
}

/// Resets the thread's active deadline when dropped.
pub(crate) struct EnteredScope {
    _private: (),
}

impl Drop for EnteredScope {
    fn drop(&mut self) {
        CURRENT.with(|current| current.borrow_mut().take());
    }
}
