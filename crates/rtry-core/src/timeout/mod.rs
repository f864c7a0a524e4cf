//! Deadlines that cancel the work they enclose.
//!
//! A [`Timeout`] can be used as a scope around a block ([`Timeout::run`],
//! [`Timeout::run_async`]) or as a decorator around an operation
//! ([`Timeout::wrap`]). Blocking scopes run the block on a worker thread and
//! release the caller at the deadline; async scopes drop the future at its
//! next `.await`. See [`Timeout::run`] for what happens to blocking work
//! that never checks its [`Deadline`].

mod blocking;
mod error;
mod scope;
mod suspend;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;

pub use error::{Cancelled, TimeoutError};
pub use scope::{Deadline, ScopeState};

/// A wall-clock bound. A zero budget disables the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    budget: Duration,
}

impl Timeout {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    /// Build from seconds, rejecting negative and non-finite values.
    pub fn from_secs_f64(secs: f64) -> Result<Self, ConfigError> {
        Duration::try_from_secs_f64(secs)
            .map(Self::new)
            .map_err(|_| ConfigError::InvalidTimeout(secs))
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Exit quietly with `None` instead of signalling `Cancelled`.
    pub fn silent(self) -> SilentTimeout {
        SilentTimeout { inner: self }
    }

    /// Run `f` on a worker thread bounded by this deadline.
    ///
    /// Returns `Err(TimeoutError::Cancelled)` as soon as the deadline
    /// elapses. The worker learns about it through the [`Deadline`] passed to
    /// `f` (also reachable as [`Deadline::current`]); code that never checks
    /// keeps running in the background and its result is dropped. Entering a
    /// second blocking deadline from inside `f` fails with
    /// [`ConfigError::NestedBlockingDeadline`].
    pub fn run<T, F>(&self, f: F) -> Result<T, TimeoutError>
    where
        F: FnOnce(&Deadline) -> T + Send + 'static,
        T: Send + 'static,
    {
        blocking::run_blocking(self.budget, f)
    }

    /// Drive the future returned by `f` until it completes or the deadline
    /// elapses, in which case it is dropped at its current suspension point.
    pub async fn run_async<T, F, Fut>(&self, f: F) -> Result<T, Cancelled>
    where
        F: FnOnce(Deadline) -> Fut,
        Fut: Future<Output = T>,
    {
        suspend::run_suspended(self.budget, f).await
    }

    /// Wrap an operation so every call runs under a fresh deadline.
    pub fn wrap<F>(self, op: F) -> Timed<F> {
        Timed {
            timeout: self,
            op: Arc::new(op),
        }
    }
}

/// A [`Timeout`] that exits without signalling when the deadline fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilentTimeout {
    inner: Timeout,
}

impl SilentTimeout {
    /// Like [`Timeout::run`], but a fired deadline yields `Ok(None)`.
    pub fn run<T, F>(&self, f: F) -> Result<Option<T>, TimeoutError>
    where
        F: FnOnce(&Deadline) -> T + Send + 'static,
        T: Send + 'static,
    {
        match self.inner.run(f) {
            Ok(value) => Ok(Some(value)),
            Err(TimeoutError::Cancelled(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn run_async<T, F, Fut>(&self, f: F) -> Option<T>
    where
        F: FnOnce(Deadline) -> Fut,
        Fut: Future<Output = T>,
    {
        self.inner.run_async(f).await.ok()
    }
}

/// An operation decorated with a [`Timeout`]; see [`Timeout::wrap`].
pub struct Timed<F> {
    timeout: Timeout,
    op: Arc<F>,
}

impl<F> Timed<F> {
    pub fn timeout(&self) -> Timeout {
        self.timeout
    }
}

impl<F, T> Timed<F>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: Send + 'static,
{
    /// Call the operation under a blocking deadline.
    pub fn call(&self) -> Result<T, TimeoutError> {
        let op = Arc::clone(&self.op);
        self.timeout.run(move |_| op())
    }
}

impl<F, Fut> Timed<F>
where
    F: Fn() -> Fut,
    Fut: Future,
{
    /// Await the operation under a suspendable deadline.
    pub async fn call_async(&self) -> Result<Fut::Output, Cancelled> {
        self.timeout.run_async(|_| (self.op)()).await
    }
}
