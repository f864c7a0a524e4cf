//! Per-attempt logging hook.

use std::borrow::Cow;
use std::fmt;

/// What a single attempt produced.
#[derive(Debug)]
pub enum Outcome<'a, T, E> {
    Value(&'a T),
    Error(&'a E),
}

impl<T, E> Outcome<'_, T, E> {
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}

impl<T, E> Clone for Outcome<'_, T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, E> Copy for Outcome<'_, T, E> {}

/// Opaque identity of the operation being retried.
///
/// Defaults to the type name of the operation closure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationId(Cow<'static, str>);

impl OperationId {
    pub fn of<F: ?Sized>() -> Self {
        OperationId(Cow::Borrowed(std::any::type_name::<F>()))
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        OperationId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Called once for every attempt whose outcome was observed.
pub trait AttemptLogger<T, E>: Send + Sync {
    fn log(&self, attempt: u32, outcome: Outcome<'_, T, E>, operation: &OperationId);
}

impl<T, E, F> AttemptLogger<T, E> for F
where
    F: Fn(u32, Outcome<'_, T, E>, &OperationId) + Send + Sync,
{
    fn log(&self, attempt: u32, outcome: Outcome<'_, T, E>, operation: &OperationId) {
        self(attempt, outcome, operation)
    }
}

/// Logs attempts through `tracing`: errors at WARN, values at DEBUG.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl<T, E> AttemptLogger<T, E> for TracingLogger
where
    T: fmt::Debug,
    E: fmt::Display,
{
    fn log(&self, attempt: u32, outcome: Outcome<'_, T, E>, operation: &OperationId) {
        match outcome {
            Outcome::Value(value) => tracing::debug!(
                operation = %operation,
                attempt,
                value = ?value,
                "attempt returned"
            ),
            Outcome::Error(error) => tracing::warn!(
                operation = %operation,
                attempt,
                error = %error,
                "attempt failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn as_logger<F>(f: F) -> F
    where
        F: Fn(u32, Outcome<'_, i32, String>, &OperationId) + Send + Sync,
    {
        f
    }

    #[test]
    fn closures_are_loggers() {
        let seen = Mutex::new(Vec::new());
        let logger = as_logger(|attempt, outcome, op| {
            seen.lock()
                .unwrap()
                .push((attempt, outcome.is_error(), op.to_string()));
        });
        let op = OperationId::named("fetch");
        AttemptLogger::log(&logger, 1, Outcome::Error(&"boom".to_string()), &op);
        AttemptLogger::log(&logger, 2, Outcome::Value(&7), &op);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, true, "fetch".to_string()), (2, false, "fetch".to_string())]
        );
    }

    #[test]
    fn operation_id_defaults_to_type_name() {
        struct Probe;
        assert!(OperationId::of::<Probe>().as_str().ends_with("Probe"));
        assert_eq!(OperationId::named("fetch").to_string(), "fetch");
    }
}
