use std::future::Future;

use crate::timeout::Timeout;

use super::error::RetryError;
use super::logger::OperationId;
use super::policy::{RetryPolicy, Step};

impl<T, E> RetryPolicy<T, E> {
    /// Await `op` until the policy says stop.
    ///
    /// A configured timeout bounds the whole sequence; when it fires the
    /// in-flight attempt (or delay) is dropped at its current `.await`.
    pub async fn run_async<F, Fut>(&self, op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_async_as(OperationId::of::<F>(), op).await
    }

    pub(crate) async fn run_async_as<F, Fut>(
        &self,
        operation: OperationId,
        op: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.deadline_budget() {
            None => drive_async(self, op, &operation).await,
            Some(budget) => Timeout::new(budget)
                .run_async(|_| drive_async(self, op, &operation))
                .await
                .unwrap_or_else(|cancelled| Err(cancelled.into())),
        }
    }
}

async fn drive_async<T, E, F, Fut>(
    policy: &RetryPolicy<T, E>,
    mut op: F,
    operation: &OperationId,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1u32;
    loop {
        let result = op().await;
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
                if delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(delay).await;
                }
                attempt = attempt.saturating_add(1);
            }
        }
    }
}
