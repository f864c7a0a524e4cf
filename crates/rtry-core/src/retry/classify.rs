//! Decide which operation errors are retried and which propagate at once.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

type Matcher<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// A named class of errors.
pub struct Kind<E> {
    name: &'static str,
    matches: Matcher<E>,
}

impl<E> Kind<E> {
    pub fn new<F>(name: &'static str, matches: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            matches: Arc::new(matches),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, error: &E) -> bool {
        (self.matches)(error)
    }
}

impl<E> Clone for Kind<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            matches: Arc::clone(&self.matches),
        }
    }
}

impl<E> fmt::Debug for Kind<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Which errors are swallowed (retried) between attempts.
///
/// Swallowing only defers propagation: once attempts run out the last
/// error is still returned to the caller.
pub enum Swallow<E> {
    /// Every error propagates on the attempt that raised it.
    Nothing,
    /// Every error is retried.
    All,
    /// Only errors matching one of the kinds are retried.
    Kinds(Vec<Kind<E>>),
}

impl<E> Default for Swallow<E> {
    fn default() -> Self {
        Swallow::All
    }
}

impl<E> Clone for Swallow<E> {
    fn clone(&self) -> Self {
        match self {
            Swallow::Nothing => Swallow::Nothing,
            Swallow::All => Swallow::All,
            Swallow::Kinds(kinds) => Swallow::Kinds(kinds.clone()),
        }
    }
}

impl<E> fmt::Debug for Swallow<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Swallow::Nothing => f.write_str("Nothing"),
            Swallow::All => f.write_str("All"),
            Swallow::Kinds(kinds) => f.debug_tuple("Kinds").field(kinds).finish(),
        }
    }
}

impl<E> Swallow<E> {
    /// Retry only errors for which `matches` returns true.
    pub fn kind<F>(name: &'static str, matches: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Swallow::Kinds(vec![Kind::new(name, matches)])
    }

    /// Add another retryable kind. `Nothing` becomes a single-kind set;
    /// `All` stays `All`.
    pub fn or_kind<F>(self, name: &'static str, matches: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        match self {
            Swallow::All => Swallow::All,
            Swallow::Nothing => Swallow::kind(name, matches),
            Swallow::Kinds(mut kinds) => {
                kinds.push(Kind::new(name, matches));
                Swallow::Kinds(kinds)
            }
        }
    }

    pub fn should_retry(&self, error: &E) -> bool {
        match self {
            Swallow::Nothing => false,
            Swallow::All => true,
            Swallow::Kinds(kinds) => kinds.iter().any(|k| k.matches(error)),
        }
    }

    /// Name of the first kind matching `error`, for logging.
    pub fn matched_kind(&self, error: &E) -> Option<&'static str> {
        match self {
            Swallow::Kinds(kinds) => kinds.iter().find(|k| k.matches(error)).map(Kind::name),
            _ => None,
        }
    }
}

/// Type-erased errors that can be matched against a concrete error type.
pub trait Downcast {
    fn is_kind<K>(&self) -> bool
    where
        K: StdError + Send + Sync + 'static;
}

impl Downcast for anyhow::Error {
    fn is_kind<K>(&self) -> bool
    where
        K: StdError + Send + Sync + 'static,
    {
        self.is::<K>()
    }
}

impl Downcast for Box<dyn StdError + Send + Sync> {
    fn is_kind<K>(&self) -> bool
    where
        K: StdError + Send + Sync + 'static,
    {
        self.downcast_ref::<K>().is_some()
    }
}

impl<E: Downcast + 'static> Swallow<E> {
    /// Retry only errors whose concrete type is `K`.
    pub fn of<K>() -> Self
    where
        K: StdError + Send + Sync + 'static,
    {
        Swallow::kind(std::any::type_name::<K>(), |e: &E| e.is_kind::<K>())
    }

    /// Also retry errors whose concrete type is `K`.
    pub fn or_of<K>(self) -> Self
    where
        K: StdError + Send + Sync + 'static,
    {
        self.or_kind(std::any::type_name::<K>(), |e: &E| e.is_kind::<K>())
    }
}
