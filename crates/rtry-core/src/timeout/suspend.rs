//! Suspendable deadline: drop the future at its next suspension point.

use std::future::Future;
use std::time::Duration;

use super::error::Cancelled;
use super::scope::Deadline;

pub(crate) async fn run_suspended<T, F, Fut>(budget: Duration, f: F) -> Result<T, Cancelled>
where
    F: FnOnce(Deadline) -> Fut,
    Fut: Future<Output = T>,
{
    let deadline = Deadline::arm(budget);
    let fut = f(deadline.clone());
    if deadline.is_unbounded() {
        let value = fut.await;
        deadline.clear();
        return Ok(value);
    }

    match tokio::time::timeout(budget, fut).await {
        Ok(value) => {
            deadline.clear();
            Ok(value)
        }
        Err(_elapsed) => {
            deadline.fire();
            tracing::debug!(
                budget_ms = budget.as_millis() as u64,
                "deadline fired, task cancelled"
            );
            Err(deadline.cancelled())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeout::ScopeState;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancels_at_suspension_point_and_runs_cleanup() {
        let cleaned = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cleaned);
        let res = run_suspended(Duration::from_millis(50), |_| async move {
            let _guard = SetOnDrop(flag);
            tokio::time::sleep(Duration::from_secs(1)).await;
            "done"
        })
        .await;
        assert!(res.is_err());
        assert!(cleaned.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn scope_state_follows_outcome() {
        let mut seen = None;
        let res = run_suspended(Duration::from_secs(1), |d| {
            seen = Some(d.clone());
            async { 1 }
        })
        .await;
        assert_eq!(res, Ok(1));
        assert_eq!(seen.unwrap().state(), ScopeState::Cleared);

        let mut seen = None;
        let res = run_suspended(Duration::from_millis(10), |d| {
            seen = Some(d.clone());
            std::future::pending::<()>()
        })
        .await;
        assert!(res.is_err());
        assert_eq!(seen.unwrap().state(), ScopeState::Fired);
    }

    #[tokio::test(start_paused = true)]
    async fn nested_scopes_are_allowed() {
        let res = run_suspended(Duration::from_secs(1), |_| async {
            run_suspended(Duration::from_millis(10), |_| {
                tokio::time::sleep(Duration::from_millis(100))
            })
            .await
        })
        .await;
        assert!(matches!(res, Ok(Err(_))));
    }
}
