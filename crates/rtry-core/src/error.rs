//! Configuration errors shared by the retry loop, deadlines and the config file.

use thiserror::Error;

/// An invalid policy or an illegal use of a primitive.
///
/// Raised eagerly (at build time or on first use), never coerced into a
/// valid value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// `attempts` must be at least 1 when given.
    #[error("attempts must be greater than zero")]
    ZeroAttempts,
    /// A delay was negative, NaN or infinite. `attempt` is 0 when the value
    /// was rejected while building the policy rather than at call time.
    #[error("invalid delay {value}s for attempt {attempt}")]
    InvalidDelay { attempt: u32, value: f64 },
    /// A timeout was negative, NaN or infinite.
    #[error("invalid timeout {0}s")]
    InvalidTimeout(f64),
    /// A blocking deadline was entered while another one is active on the
    /// same thread of control.
    #[error("a blocking deadline is already active on this thread")]
    NestedBlockingDeadline,
}
