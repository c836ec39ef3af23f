//! Deferred, zero-argument producers
//!
//! Solution factories, schema builders and a schema's deferred type list are all
//! "call me later" values. They share this one capability instead of ad-hoc
//! closures so the memoizing owners ([`SolutionRegistry`], [`SchemaBuilder`])
//! can hold them uniformly.
//!
//! Any `Fn() -> T + Send + Sync` closure is a `Resolvable<T>`.
//!
//! [`SolutionRegistry`]: crate::resolver::SolutionRegistry
//! [`SchemaBuilder`]: crate::schema::SchemaBuilder

use std::sync::Arc;

/// A value that can be produced on demand
pub trait Resolvable<T>: Send + Sync {
    /// Produce the value
    ///
    /// Implementations may be expensive; callers decide whether the result is
    /// memoized.
    fn resolve(&self) -> T;
}

impl<T, F> Resolvable<T> for F
where
    F: Fn() -> T + Send + Sync,
{
    fn resolve(&self) -> T {
        self()
    }
}

/// Shared, type-erased [`Resolvable`]
pub type SharedResolvable<T> = Arc<dyn Resolvable<T>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl Resolvable<usize> for Counter {
        fn resolve(&self) -> usize {
            self.0.fetch_add(1, Ordering::SeqCst) + 1
        }
    }

    #[test]
    fn test_closure_is_resolvable() {
        let factory: SharedResolvable<String> = Arc::new(|| "pong".to_string());
        assert_eq!(factory.resolve(), "pong");
    }

    #[test]
    fn test_resolvable_is_not_memoized_by_itself() {
        let counter = Counter(AtomicUsize::new(0));
        assert_eq!(counter.resolve(), 1);
        assert_eq!(counter.resolve(), 2);
    }
}
