//! In-process cache backend

use crate::domain::CacheStore;
use parking_lot::RwLock;
use serde_json::Value as Json;
use std::collections::HashMap;

/// Map-backed cache without expiry
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Json>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn flush(&self) {
        self.entries.write().clear();
    }
}

impl CacheStore for InMemoryCache {
    fn get(&self, key: &str) -> Option<Json> {
        self.entries.read().get(key).cloned()
    }

    fn forever(&self, key: &str, value: Json) {
        self.entries.write().insert(key.to_string(), value);
    }

    fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    fn forget(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }
}
