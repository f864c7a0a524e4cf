//! Blocking attempt loop.

use std::thread;

use crate::error::ConfigError;
use crate::timeout::{Cancelled, Deadline, Timeout};

use super::error::RetryError;
use super::logger::OperationId;
use super::policy::{RetryPolicy, Step};

impl<T, E> RetryPolicy<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Run `op` until the policy says stop.
    ///
    /// With a timeout configured the whole loop runs under one blocking
    /// deadline (see [`Timeout::run`]); `op` can reach it through
    /// [`Deadline::current`]. Use [`RetryPolicy::run_local`] for operations
    /// that borrow from the caller.
    pub fn run<F>(&self, op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E> + Send + 'static,
    {
        self.run_as(OperationId::of::<F>(), op)
    }

    pub(crate) fn run_as<F>(&self, operation: OperationId, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E> + Send + 'static,
    {
        let Some(budget) = self.deadline_budget() else {
            return drive(self, &mut op, &operation, None);
        };
        let policy = self.clone();
        Timeout::new(budget)
            .run(move |deadline| drive(&policy, &mut op, &operation, Some(deadline)))
            .unwrap_or_else(|e| Err(e.into()))
    }
}

impl<T, E> RetryPolicy<T, E> {
    /// Run `op` inline on the calling thread.
    ///
    /// `op` may borrow local state. A configured timeout is enforced
    /// cooperatively: it is checked between attempts and interrupts the
    /// delay, but never an attempt in progress.
    pub fn run_local<F>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        let operation = OperationId::of::<F>();
        let Some(budget) = self.deadline_budget() else {
            return drive(self, &mut op, &operation, None);
        };
        if Deadline::is_active_on_thread() {
            return Err(ConfigError::NestedBlockingDeadline.into());
        }
        let deadline = Deadline::arm(budget);
        let result = {
            let _entered = deadline.enter();
            drive(self, &mut op, &operation, Some(&deadline))
        };
        deadline.clear();
        result
    }
}

fn drive<T, E, F>(
    policy: &RetryPolicy<T, E>,
    op: &mut F,
    operation: &OperationId,
    deadline: Option<&Deadline>,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, E>,
{
    let mut attempt = 1u32;
    loop {
        checkpoint(deadline)?;
        let result = op();
        // An attempt that outlived the deadline produces no outcome.
        checkpoint(deadline)?;

        match policy.settle(attempt, result, operation) {
            Step::Return(value) => return Ok(value),
            Step::Raise(e) => return Err(e),
            Step::Again(delay) => {
                tracing::trace!(
                    operation = %operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "scheduling next attempt"
                );
                match deadline {
                    Some(deadline) => deadline.sleep(delay)?,
                    None if delay.is_zero() => thread::yield_now(),
                    None => thread::sleep(delay),
                }
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

fn checkpoint(deadline: Option<&Deadline>) -> Result<(), Cancelled> {
    deadline.map_or(Ok(()), Deadline::checkpoint)
}
