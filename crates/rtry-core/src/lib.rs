//! Retry an operation until it succeeds, a predicate is met, attempts run
//! out or a deadline fires.

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;
pub mod timeout;

pub use error::ConfigError;
pub use retry::{
    AttemptLogger, Delay, OperationId, Outcome, RetryDefaults, RetryError, RetryPolicy,
    Retrying, Swallow, TracingLogger,
};
pub use timeout::{Cancelled, Deadline, ScopeState, Timeout, TimeoutError};
