//! Settings manager - orchestrates scope, cache, storage and casts

use super::cache::{remember_forever, resolve_cache_key, CacheIndex, CacheStore, KeySelection};
use super::cast::CastRegistry;
use super::filter::{EntryFilter, Settingable};
use super::payload::reconstruct;
use super::repository::SettingsRepository;
use super::scoped::ScopedSettings;
use crate::config::CacheConfig;
use crate::contract::{Entry, SettingsApi, SettingsError, Value};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value as Json;
use std::sync::Arc;

/// Raw lookup result: stored payload per key, `None` when absent
type RawEntries = IndexMap<String, Option<Json>>;

/// Settings manager
pub struct Settings {
    repository: Arc<dyn SettingsRepository>,
    cache: Arc<dyn CacheStore>,
    casts: Arc<CastRegistry>,
    cache_config: CacheConfig,
    /// Cache keys filled by this manager, for invalidation on writes
    cache_index: CacheIndex,
}

impl Settings {
    /// Create a new manager instance
    pub fn new(
        repository: Arc<dyn SettingsRepository>,
        cache: Arc<dyn CacheStore>,
        casts: Arc<CastRegistry>,
        cache_config: CacheConfig,
    ) -> Self {
        Self {
            repository,
            cache,
            casts,
            cache_config,
            cache_index: CacheIndex::default(),
        }
    }

    // ===== Scoped entry points =====

    /// Unscoped builder: default group, global entries, nothing excluded
    pub fn scoped(&self) -> ScopedSettings<'_> {
        ScopedSettings::new(self)
    }

    pub fn group(&self, name: impl Into<String>) -> ScopedSettings<'_> {
        self.scoped().group(name)
    }

    pub fn for_owner<O: Settingable + ?Sized>(
        &self,
        owner: &O,
    ) -> Result<ScopedSettings<'_>, SettingsError> {
        self.scoped().for_owner(owner)
    }

    pub fn except<I, S>(&self, keys: I) -> ScopedSettings<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scoped().except(keys)
    }

    pub fn casts(&self) -> &CastRegistry {
        &self.casts
    }

    /// Cache key a read of `selection` under `filter` is stored at
    pub fn resolve_cache_key(&self, filter: &EntryFilter, selection: &KeySelection) -> String {
        resolve_cache_key(&self.cache_config.prefix, filter, selection)
    }

    /// Stored rows in scope, payloads left raw
    pub async fn entries(&self, filter: EntryFilter) -> Result<Vec<Entry>, SettingsError> {
        self.repository
            .entries(&filter)
            .await
            .map_err(|e| storage_error("entries", e))
    }

    // ===== Helper Methods =====

    /// Raw payloads for `selection`, through the cache when enabled.
    ///
    /// The cache holds what storage returned, not reconstructed values, so
    /// caller defaults never end up cached and casts run on every read.
    async fn fetch(
        &self,
        filter: &EntryFilter,
        selection: &KeySelection,
    ) -> Result<RawEntries, SettingsError> {
        if !self.cache_config.enabled {
            return self.load(filter, selection).await;
        }

        let cache_key = self.resolve_cache_key(filter, selection);
        let cached = remember_forever(self.cache.as_ref(), &cache_key, || async {
            let raw = self.load(filter, selection).await?;
            // Absent keys are left out so a stored `null` stays distinguishable
            Ok::<_, SettingsError>(Json::Object(
                raw.into_iter()
                    .filter_map(|(key, payload)| payload.map(|payload| (key, payload)))
                    .collect(),
            ))
        })
        .await?;
        self.cache_index.record(filter, &cache_key, selection);

        Ok(match cached {
            Json::Object(map) => map
                .into_iter()
                .map(|(key, payload)| (key, Some(payload)))
                .collect(),
            other => {
                tracing::warn!(cache_key = %cache_key, kind = ?other, "Unexpected cached settings shape");
                RawEntries::new()
            }
        })
    }

    async fn load(
        &self,
        filter: &EntryFilter,
        selection: &KeySelection,
    ) -> Result<RawEntries, SettingsError> {
        match selection {
            KeySelection::Keys(keys) => self
                .repository
                .get(filter, keys)
                .await
                .map_err(|e| storage_error("get", e)),
            KeySelection::All => self
                .repository
                .all(filter)
                .await
                .map(|entries| entries.into_iter().map(|(k, v)| (k, Some(v))).collect())
                .map_err(|e| storage_error("all", e)),
        }
    }

    /// Forget every cache entry a write to `keys` under `filter` makes stale
    fn invalidate(&self, filter: &EntryFilter, keys: &[String]) {
        if !self.cache_config.enabled {
            return;
        }

        let mut stale = self.cache_index.take_affected(filter, keys);
        stale.push(self.resolve_cache_key(filter, &KeySelection::Keys(keys.to_vec())));

        for cache_key in stale {
            if self.cache.has(&cache_key) {
                self.cache.forget(&cache_key);
                tracing::trace!(cache_key = %cache_key, "Settings cache entry forgotten");
            }
        }
    }

    /// Invalidate, write, invalidate again.
    ///
    /// The second pass drops anything a concurrent reader cached from the
    /// pre-write state while the write was in flight.
    async fn write(
        &self,
        filter: &EntryFilter,
        payloads: Vec<(String, Json)>,
    ) -> Result<(), SettingsError> {
        let keys: Vec<String> = payloads.iter().map(|(key, _)| key.clone()).collect();

        self.invalidate(filter, &keys);
        self.repository
            .set(filter, &payloads)
            .await
            .map_err(|e| storage_error("set", e))?;
        self.invalidate(filter, &keys);
        Ok(())
    }
}

fn storage_error(operation: &str, err: anyhow::Error) -> SettingsError {
    tracing::error!(operation, error = %format!("{err:#}"), "Settings storage operation failed");
    SettingsError::from(err)
}

fn log_scope(operation: &str, filter: &EntryFilter, keys: &[String]) {
    tracing::debug!(
        operation,
        keys = ?keys,
        group = filter.group(),
        owner = ?filter.owner(),
        excepts = ?filter.excepts(),
        "Settings operation"
    );
}

#[async_trait]
impl SettingsApi for Settings {
    async fn get(
        &self,
        filter: EntryFilter,
        key: &str,
        default: Value,
    ) -> Result<Value, SettingsError> {
        let selection = KeySelection::one(key);
        log_scope("get", &filter, std::slice::from_ref(&key.to_string()));

        let mut raw = self.fetch(&filter, &selection).await?;
        match raw.swap_remove(key).flatten() {
            Some(payload) => reconstruct(payload, &self.casts),
            None => Ok(default),
        }
    }

    async fn get_many(
        &self,
        filter: EntryFilter,
        keys: &[String],
        default: Value,
    ) -> Result<IndexMap<String, Value>, SettingsError> {
        log_scope("get_many", &filter, keys);
        if keys.is_empty() {
            return Ok(IndexMap::new());
        }

        let selection = KeySelection::Keys(keys.to_vec());
        let mut raw = self.fetch(&filter, &selection).await?;

        let mut values = IndexMap::with_capacity(keys.len());
        for key in keys {
            let value = match raw.swap_remove(key).flatten() {
                Some(payload) => reconstruct(payload, &self.casts)?,
                None if values.contains_key(key) => continue,
                None => default.clone(),
            };
            values.insert(key.clone(), value);
        }
        Ok(values)
    }

    async fn set(&self, filter: EntryFilter, key: &str, value: Value) -> Result<(), SettingsError> {
        log_scope("set", &filter, std::slice::from_ref(&key.to_string()));

        let payload = self.casts.handle(&value)?;
        self.write(&filter, vec![(key.to_string(), payload)]).await
    }

    async fn set_many(
        &self,
        filter: EntryFilter,
        values: IndexMap<String, Value>,
    ) -> Result<(), SettingsError> {
        let keys: Vec<String> = values.keys().cloned().collect();
        log_scope("set_many", &filter, &keys);
        if values.is_empty() {
            return Ok(());
        }

        // Cast everything up front so a bad value aborts before any write
        let payloads = values
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.casts.handle(value)?)))
            .collect::<Result<Vec<_>, SettingsError>>()?;
        self.write(&filter, payloads).await
    }

    async fn forget(&self, filter: EntryFilter, keys: &[String]) -> Result<(), SettingsError> {
        log_scope("forget", &filter, keys);
        if keys.is_empty() {
            return Ok(());
        }

        self.invalidate(&filter, keys);
        self.repository
            .forget(&filter, keys)
            .await
            .map_err(|e| storage_error("forget", e))?;
        self.invalidate(&filter, keys);
        Ok(())
    }

    async fn all(&self, filter: EntryFilter) -> Result<IndexMap<String, Value>, SettingsError> {
        log_scope("all", &filter, &[]);

        let raw = self.fetch(&filter, &KeySelection::All).await?;
        raw.into_iter()
            .filter_map(|(key, payload)| payload.map(|payload| (key, payload)))
            .map(|(key, payload)| Ok((key, reconstruct(payload, &self.casts)?)))
            .collect()
    }
}
