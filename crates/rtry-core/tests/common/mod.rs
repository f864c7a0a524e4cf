//! Shared helpers for integration tests.

use std::sync::{Arc, Mutex};

use rtry_core::retry::{AttemptLogger, OperationId, Outcome};

/// Logger that records `(attempt, rendered outcome)` pairs.
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<(u32, String)>>>,
}

impl Recorder {
    pub fn attempts(&self) -> Vec<u32> {
        self.entries.lock().unwrap().iter().map(|(a, _)| *a).collect()
    }

    pub fn entries(&self) -> Vec<(u32, String)> {
        self.entries.lock().unwrap().clone()
    }
}

impl<T, E> AttemptLogger<T, E> for Recorder
where
    T: std::fmt::Debug,
    E: std::fmt::Display,
{
    fn log(&self, attempt: u32, outcome: Outcome<'_, T, E>, _operation: &OperationId) {
        let rendered = match outcome {
            Outcome::Value(v) => format!("{v:?}"),
            Outcome::Error(e) => format!("error: {e}"),
        };
        self.entries.lock().unwrap().push((attempt, rendered));
    }
}
