//! Pause inserted between two attempts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;

type DelayFn = Arc<dyn Fn(u32) -> f64 + Send + Sync>;

/// How long to wait after a failed attempt before the next one.
///
/// `attempt` passed to [`Delay::compute`] is the 1-based index of the attempt
/// that just failed.
#[derive(Clone)]
pub enum Delay {
    Constant(Duration),
    /// `base * 2^(attempt-1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
    /// Seconds computed from the attempt index. Validated on every call.
    Computed(DelayFn),
}

impl Default for Delay {
    fn default() -> Self {
        Delay::Constant(Duration::ZERO)
    }
}

impl Delay {
    pub fn constant(delay: Duration) -> Self {
        Delay::Constant(delay)
    }

    /// Constant delay from seconds, rejecting negative and non-finite values.
    pub fn from_secs_f64(secs: f64) -> Result<Self, ConfigError> {
        let d = checked_secs(0, secs)?;
        Ok(Delay::Constant(d))
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        Delay::Exponential { base, max }
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(u32) -> f64 + Send + Sync + 'static,
    {
        Delay::Computed(Arc::new(f))
    }

    pub fn compute(&self, attempt: u32) -> Result<Duration, ConfigError> {
        match self {
            Delay::Constant(d) => Ok(*d),
            Delay::Exponential { base, max } => {
                let exp = 1u32 << attempt.saturating_sub(1).min(8);
                Ok(base.saturating_mul(exp).min(*max))
            }
            Delay::Computed(f) => checked_secs(attempt, f(attempt)),
        }
    }
}

fn checked_secs(attempt: u32, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidDelay {
        attempt,
        value: secs,
    })
}

impl fmt::Debug for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::Constant(d) => f.debug_tuple("Constant").field(d).finish(),
            Delay::Exponential { base, max } => f
                .debug_struct("Exponential")
                .field("base", base)
                .field("max", max)
                .finish(),
            Delay::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}
