//! Cancellation signal and blocking-scope errors.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::error::ConfigError;

/// Raised when a deadline fires. Distinct from any error produced by the
/// wrapped operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled: deadline of {}ms exceeded", .after.as_millis())]
pub struct Cancelled {
    after: Duration,
}

impl Cancelled {
    pub(crate) fn new(after: Duration) -> Self {
        Self { after }
    }

    /// The deadline that was exceeded.
    pub fn deadline(&self) -> Duration {
        self.after
    }
}

/// Error returned by a blocking deadline scope.
#[derive(Debug, Error)]
pub enum TimeoutError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The worker thread that runs the enclosed closure could not be started.
    #[error("failed to start deadline worker: {0}")]
    Spawn(#[source] io::Error),
}

impl TimeoutError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TimeoutError::Cancelled(_))
    }
}
