//! Retry policy and the attempt loop.
//!
//! A [`RetryPolicy`] combines an attempt bound, an optional `until`
//! predicate, a [`Delay`] between attempts, a [`Swallow`] classifier for
//! errors, an optional [`AttemptLogger`] and an optional timeout shared by
//! the whole sequence. Run it directly ([`RetryPolicy::run`],
//! [`RetryPolicy::run_async`]) or bind it to an operation with
//! [`RetryPolicy::wrap`].

mod classify;
mod delay;
mod error;
mod logger;
mod policy;
mod run;
mod run_async;
mod wrap;

pub use classify::{Downcast, Kind, Swallow};
pub use delay::Delay;
pub use error::RetryError;
pub use logger::{AttemptLogger, OperationId, Outcome, TracingLogger};
pub use policy::{RetryDefaults, RetryPolicy, RetryPolicyBuilder};
pub use wrap::Retrying;
