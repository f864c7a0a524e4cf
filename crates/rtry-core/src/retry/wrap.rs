use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use super::error::RetryError;
use super::logger::OperationId;
use super::policy::RetryPolicy;

/// An operation bound to a [`RetryPolicy`]; see [`RetryPolicy::wrap`].
///
/// Each call is an independent retry sequence with its own attempt count
/// and deadline.
pub struct Retrying<T, E, F> {
    policy: RetryPolicy<T, E>,
    op: Arc<F>,
    operation: OperationId,
}

impl<T, E> RetryPolicy<T, E> {
    /// Decorate `op` with this policy.
    pub fn wrap<F>(&self, op: F) -> Retrying<T, E, F> {
        Retrying {
            policy: self.clone(),
            op: Arc::new(op),
            operation: OperationId::of::<F>(),
        }
    }
}

impl<T, E, F> Retrying<T, E, F> {
    /// Name reported to the attempt logger instead of the closure type.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.operation = OperationId::named(name);
        self
    }

    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    pub fn policy(&self) -> &RetryPolicy<T, E> {
        &self.policy
    }
}

impl<T, E, F> Retrying<T, E, F>
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn call(&self) -> Result<T, RetryError<E>> {
        let op = Arc::clone(&self.op);
        self.policy.run_as(self.operation.clone(), move || op())
    }
}

impl<T, E, F, Fut> Retrying<T, E, F>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    pub async fn call_async(&self) -> Result<T, RetryError<E>> {
        self.policy
            .run_async_as(self.operation.clone(), || (self.op)())
            .await
    }
}

impl<T, E, F> Clone for Retrying<T, E, F> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            op: Arc::clone(&self.op),
            operation: self.operation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("not yet")]
    struct NotYet;

    #[test]
    fn each_call_is_a_fresh_sequence() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let policy = RetryPolicy::<u32, NotYet>::builder()
            .attempts(2)
            .build()
            .unwrap();
        let op = policy.wrap(move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Err(NotYet)
            } else {
                Ok(n)
            }
        });
        assert_eq!(op.call().unwrap(), 1);
        assert_eq!(op.call().unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn logger_sees_given_name() {
        let names = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&names);
        let policy = RetryPolicy::<(), NotYet>::builder()
            .attempts(2)
            .log_with(move |_, _, op| seen.lock().unwrap().push(op.to_string()))
            .build()
            .unwrap();

        let _ = policy.wrap(|| Err(NotYet)).named("fetch-index").call();
        assert_eq!(*names.lock().unwrap(), vec!["fetch-index", "fetch-index"]);
    }

    #[tokio::test(start_paused = true)]
    async fn async_decorator() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let policy = RetryPolicy::<&str, NotYet>::builder()
            .attempts(3)
            .build()
            .unwrap();
        let op = policy.wrap(move || {
            let c = Arc::clone(&c);
            async move {
                match c.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(NotYet),
                    _ => Ok("ready"),
                }
            }
        });
        assert_eq!(op.call_async().await.unwrap(), "ready");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
