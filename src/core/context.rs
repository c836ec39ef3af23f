//! Per-request context container
//!
//! A fresh [`ContextValue`] is created for every execution. Executor-context and
//! pre-execute hooks seed it (current user, request id, ...) and field
//! resolvers read it back.

use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared, mutable key/value bag handed to every resolver of one request
///
/// Cloning is cheap and clones observe the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct ContextValue {
    inner: Arc<RwLock<Map<String, Value>>>,
}

impl ContextValue {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, returning the previous value
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value)
    }

    /// Get a copy of an entry
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Remove an entry
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Snapshot of the whole container as a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.inner
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        )
    }
}
