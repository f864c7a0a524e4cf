use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;

use super::classify::Swallow;
use super::delay::Delay;
use super::error::RetryError;
use super::logger::{AttemptLogger, OperationId, Outcome};

type UntilFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Default values a [`RetryPolicyBuilder`] starts from.
///
/// Immutable; load one from the config file or use `Default` (unbounded
/// attempts, no delay, swallow every error, no timeout).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryDefaults {
    pub attempts: Option<u32>,
    pub delay: Duration,
    /// `true` retries every error, `false` retries none.
    pub swallow_all: bool,
    pub timeout: Option<Duration>,
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            attempts: None,
            delay: Duration::ZERO,
            swallow_all: true,
            timeout: None,
        }
    }
}

/// What to do after an attempt.
pub(crate) enum Step<T, E> {
    Return(T),
    Raise(RetryError<E>),
    /// Wait this long, then make the next attempt.
    Again(Duration),
}

/// How an operation is retried.
///
/// Built once per call site with [`RetryPolicy::builder`] and then shared;
/// cloning is cheap.
pub struct RetryPolicy<T, E> {
    attempts: Option<NonZeroU32>,
    until: Option<UntilFn<T>>,
    delay: Delay,
    swallow: Swallow<E>,
    logger: Option<Arc<dyn AttemptLogger<T, E>>>,
    timeout: Option<Duration>,
}

impl<T, E> RetryPolicy<T, E> {
    pub fn builder() -> RetryPolicyBuilder<T, E> {
        Self::builder_from(&RetryDefaults::default())
    }

    pub fn builder_from(defaults: &RetryDefaults) -> RetryPolicyBuilder<T, E> {
        RetryPolicyBuilder {
            attempts: defaults.attempts,
            until: None,
            delay: Delay::Constant(defaults.delay),
            swallow: if defaults.swallow_all {
                Swallow::All
            } else {
                Swallow::Nothing
            },
            logger: None,
            timeout: defaults.timeout,
        }
    }

    pub fn attempts(&self) -> Option<u32> {
        self.attempts.map(NonZeroU32::get)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The deadline shared by all attempts, if one is armed.
    pub(crate) fn deadline_budget(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }

    /// Classify the outcome of attempt `attempt`, log it, and decide what
    /// comes next.
    pub(crate) fn settle(
        &self,
        attempt: u32,
        result: Result<T, E>,
        operation: &OperationId,
    ) -> Step<T, E> {
        let satisfied = match &result {
            Ok(value) => self.until.as_ref().map_or(true, |until| until(value)),
            Err(_) => false,
        };
        if let Some(logger) = &self.logger {
            let outcome = match &result {
                Ok(value) => Outcome::Value(value),
                Err(error) => Outcome::Error(error),
            };
            logger.log(attempt, outcome, operation);
        }

        let last = self.attempts.is_some_and(|n| attempt >= n.get());
        match result {
            Ok(value) if satisfied || last => return Step::Return(value),
            Err(source) if !self.swallow.should_retry(&source) => {
                return Step::Raise(RetryError::NonRetryable { attempt, source });
            }
            Err(source) if last => {
                return Step::Raise(RetryError::Exhausted {
                    attempts: attempt,
                    source,
                });
            }
            _ => {}
        }

        match self.delay.compute(attempt) {
            Ok(delay) => Step::Again(delay),
            Err(e) => Step::Raise(e.into()),
        }
    }
}

impl<T, E> Clone for RetryPolicy<T, E> {
    fn clone(&self) -> Self {
        Self {
            attempts: self.attempts,
            until: self.until.clone(),
            delay: self.delay.clone(),
            swallow: self.swallow.clone(),
            logger: self.logger.clone(),
            timeout: self.timeout,
        }
    }
}

impl<T, E> fmt::Debug for RetryPolicy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("attempts", &self.attempts)
            .field("until", &self.until.as_ref().map(|_| ".."))
            .field("delay", &self.delay)
            .field("swallow", &self.swallow)
            .field("logger", &self.logger.as_ref().map(|_| ".."))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder for [`RetryPolicy`].
pub struct RetryPolicyBuilder<T, E> {
    attempts: Option<u32>,
    until: Option<UntilFn<T>>,
    delay: Delay,
    swallow: Swallow<E>,
    logger: Option<Arc<dyn AttemptLogger<T, E>>>,
    timeout: Option<Duration>,
}

impl<T, E> RetryPolicyBuilder<T, E> {
    /// Maximum number of attempts, including the first.
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    /// Remove the attempt bound.
    pub fn unbounded(mut self) -> Self {
        self.attempts = None;
        self
    }

    /// Stop as soon as a returned value satisfies `until`.
    pub fn until<F>(mut self, until: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.until = Some(Arc::new(until));
        self
    }

    pub fn delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }

    pub fn swallow(mut self, swallow: Swallow<E>) -> Self {
        self.swallow = swallow;
        self
    }

    pub fn logger<L>(mut self, logger: L) -> Self
    where
        L: AttemptLogger<T, E> + 'static,
    {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Log attempts with a closure.
    pub fn log_with<F>(self, f: F) -> Self
    where
        F: Fn(u32, Outcome<'_, T, E>, &OperationId) + Send + Sync + 'static,
    {
        self.logger(f)
    }

    /// Bound the whole retry sequence, delays included. A zero duration
    /// disables the bound.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<RetryPolicy<T, E>, ConfigError> {
        let attempts = match self.attempts {
            Some(n) => Some(NonZeroU32::new(n).ok_or(ConfigError::ZeroAttempts)?),
            None => None,
        };
        if attempts.is_none() && self.timeout.map_or(true, |t| t.is_zero()) {
            tracing::warn!(
                "retry policy has neither attempts nor timeout; it stops only on success"
            );
        }
        Ok(RetryPolicy {
            attempts,
            until: self.until,
            delay: self.delay,
            swallow: self.swallow,
            logger: self.logger,
            timeout: self.timeout,
        })
    }
}
