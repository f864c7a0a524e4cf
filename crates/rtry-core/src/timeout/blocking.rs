//! Blocking deadline: run the closure on a worker thread, wait bounded.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::error::ConfigError;

use super::error::TimeoutError;
use super::scope::Deadline;

/// Runs `f` under a blocking deadline of `budget`.
///
/// The caller is released as soon as the deadline elapses. The worker is
/// told through its [`Deadline`] and stops at its next checkpoint; work that
/// never checks keeps running in the background until it returns, and its
/// result is discarded.
pub(crate) fn run_blocking<T, F>(budget: Duration, f: F) -> Result<T, TimeoutError>
where
    F: FnOnce(&Deadline) -> T + Send + 'static,
    T: Send + 'static,
{
    let deadline = Deadline::arm(budget);
    if deadline.is_unbounded() {
        let value = f(&deadline);
        deadline.clear();
        return Ok(value);
    }
    if Deadline::is_active_on_thread() {
        return Err(ConfigError::NestedBlockingDeadline.into());
    }

    let (tx, rx) = mpsc::channel();
    let worker = deadline.clone();
    thread::Builder::new()
        .name("rtry-deadline".into())
        .spawn(move || {
            let _entered = worker.enter();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&worker)));
            let _ = tx.send(outcome);
        })
        .map_err(TimeoutError::Spawn)?;
    tracing::debug!(budget_ms = budget.as_millis() as u64, "deadline armed");

    let wait = deadline.remaining().unwrap_or(budget);
    let outcome = match rx.recv_timeout(wait) {
        Ok(outcome) => outcome,
        // The worker may have finished right at the deadline.
        Err(RecvTimeoutError::Timeout) => match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(_) => return Err(fire(&deadline)),
        },
        Err(RecvTimeoutError::Disconnected) => return Err(fire(&deadline)),
    };

    // The worker can fire the scope itself at a checkpoint; its result is
    // then discarded like that of an abandoned worker.
    if !deadline.clear() {
        return Err(deadline.cancelled().into());
    }
    match outcome {
        Ok(value) => Ok(value),
        Err(payload) => panic::resume_unwind(payload),
    }
}

fn fire(deadline: &Deadline) -> TimeoutError {
    deadline.fire();
    tracing::debug!(
        budget_ms = deadline.budget().as_millis() as u64,
        "deadline fired, worker abandoned"
    );
    deadline.cancelled().into()
}
