//! Error returned by the attempt loop.

use std::io;

use thiserror::Error;

use crate::error::ConfigError;
use crate::timeout::{Cancelled, TimeoutError};

/// Why a retried operation did not produce a value.
///
/// When attempts run out under an `until` predicate the last value is
/// returned as `Ok`; only errors raised by the operation end up here.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The final attempt failed with a retryable error.
    #[error("gave up after {attempts} attempt(s)")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },
    /// The error was not swallowed; remaining attempts were skipped.
    #[error("attempt {attempt} failed with a non-retryable error")]
    NonRetryable {
        attempt: u32,
        #[source]
        source: E,
    },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start deadline worker: {0}")]
    Spawn(#[source] io::Error),
}

impl<E> RetryError<E> {
    /// The error raised by the operation, if that is what stopped the loop.
    pub fn source_error(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NonRetryable { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NonRetryable { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    /// Number of attempts made, when the operation's own error ended the loop.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RetryError::Exhausted { attempts, .. } => Some(*attempts),
            RetryError::NonRetryable { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled(_))
    }
}

impl<E> From<TimeoutError> for RetryError<E> {
    fn from(e: TimeoutError) -> Self {
        match e {
            TimeoutError::Cancelled(c) => RetryError::Cancelled(c),
            TimeoutError::Config(c) => RetryError::Config(c),
            TimeoutError::Spawn(e) => RetryError::Spawn(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn exhausted_exposes_source() {
        let err: RetryError<io::Error> = RetryError::Exhausted {
            attempts: 3,
            source: io::Error::new(io::ErrorKind::Other, "flaky"),
        };
        assert_eq!(err.to_string(), "gave up after 3 attempt(s)");
        assert_eq!(err.source().unwrap().to_string(), "flaky");
        assert_eq!(err.attempts(), Some(3));
        assert_eq!(err.into_source().unwrap().to_string(), "flaky");
    }

    #[test]
    fn cancellation_carries_no_source() {
        let err: RetryError<io::Error> =
            TimeoutError::Cancelled(crate::timeout::Cancelled::new(std::time::Duration::from_millis(5)))
                .into();
        assert!(err.is_cancelled());
        assert!(err.source_error().is_none());
        assert!(err.attempts().is_none());
    }
}
