//! Key prefixing so one backing store can hold windows for several clients.

use std::sync::Arc;

use quota_core::ports::{KeyValueStore, StoreError};

/// Wraps a store and prefixes every key with `"{scope}:"`.
pub struct ScopedStore {
    inner: Arc<dyn KeyValueStore>,
    scope: String,
}

impl ScopedStore {
    pub fn new(inner: Arc<dyn KeyValueStore>, scope: impl Into<String>) -> Self {
        Self {
            inner,
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.scope, key)
    }
}

impl KeyValueStore for ScopedStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(&self.make_key(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(&self.make_key(key), value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(&self.make_key(key))
    }
}
