//! Cache contract and cache-key bookkeeping
//!
//! The cache is "remember forever until explicitly forgotten", so every write
//! has to find and forget each cache entry that could hold the old value.

use super::filter::EntryFilter;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::future::Future;

/// Process-wide cache backend
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Json>;

    /// Store `value` without expiry
    fn forever(&self, key: &str, value: Json);

    fn has(&self, key: &str) -> bool;

    /// Returns whether something was removed
    fn forget(&self, key: &str) -> bool;
}

/// Return the cached value for `key`, computing and storing it on a miss
pub async fn remember_forever<F, Fut, E>(
    cache: &dyn CacheStore,
    key: &str,
    producer: F,
) -> Result<Json, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Json, E>>,
{
    if let Some(hit) = cache.get(key) {
        tracing::trace!(cache_key = key, "Settings cache hit");
        return Ok(hit);
    }

    tracing::trace!(cache_key = key, "Settings cache miss");
    let value = producer().await?;
    cache.forever(key, value.clone());
    Ok(value)
}

/// Which keys a read asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelection {
    /// `all()` read
    All,
    /// Explicit keys, in request order
    Keys(Vec<String>),
}

impl KeySelection {
    pub fn one(key: &str) -> Self {
        Self::Keys(vec![key.to_string()])
    }

    /// Whether a write to any of `keys` can change what this read returns
    pub fn overlaps(&self, keys: &[String]) -> bool {
        match self {
            Self::All => true,
            Self::Keys(own) => own.iter().any(|key| keys.contains(key)),
        }
    }
}

/// Deterministic cache key for a read of `selection` under `filter`.
///
/// Keys, group and owner are rendered as JSON strings, so separators inside
/// them cannot make two different reads share a key.
pub fn resolve_cache_key(prefix: &str, filter: &EntryFilter, selection: &KeySelection) -> String {
    let keys = match selection {
        KeySelection::All => "*".to_string(),
        KeySelection::Keys(keys) => encode(keys),
    };
    let owner = filter
        .owner()
        .map(|owner| encode(&[&owner.owner_type, &owner.owner_id]))
        .unwrap_or_default();

    format!(
        "{prefix}settings.keys={keys}&group={}&excepts={}&for={owner}",
        encode(filter.group()),
        encode(filter.excepts()),
    )
}

fn encode<T: Serialize + ?Sized>(part: &T) -> String {
    // Strings and string sequences always serialize
    serde_json::to_string(part).unwrap_or_default()
}

fn scope_fingerprint(filter: &EntryFilter) -> String {
    match filter.owner() {
        Some(owner) => format!("{}|{}#{}", filter.group(), owner.owner_type, owner.owner_id),
        None => format!("{}|", filter.group()),
    }
}

/// Cache keys populated by reads, grouped by (group, owner) scope
#[derive(Debug, Default)]
pub struct CacheIndex {
    scopes: Mutex<HashMap<String, HashMap<String, KeySelection>>>,
}

impl CacheIndex {
    pub fn record(&self, filter: &EntryFilter, cache_key: &str, selection: &KeySelection) {
        self.scopes
            .lock()
            .entry(scope_fingerprint(filter))
            .or_default()
            .insert(cache_key.to_string(), selection.clone());
    }

    /// Remove and return the cache keys a write to `keys` makes stale
    pub fn take_affected(&self, filter: &EntryFilter, keys: &[String]) -> Vec<String> {
        let mut scopes = self.scopes.lock();
        let Some(recorded) = scopes.get_mut(&scope_fingerprint(filter)) else {
            return Vec::new();
        };

        let stale: Vec<String> = recorded
            .iter()
            .filter(|(_, selection)| selection.overlaps(keys))
            .map(|(cache_key, _)| cache_key.clone())
            .collect();
        for cache_key in &stale {
            recorded.remove(cache_key);
        }
        stale
    }
}
