//! In-memory repository implementation
//!
//! Honors the same contract as the database repository; useful for tests and
//! for hosts that do not need durable settings.

use crate::contract::{Entry, OwnerRef};
use crate::domain::{EntryFilter, SettingsRepository};
use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// (key, group, owner) - the unique scoped tuple
type ScopedKey = (String, String, Option<OwnerRef>);

#[derive(Clone, Default)]
pub struct InMemorySettingsRepository {
    data: Arc<RwLock<BTreeMap<ScopedKey, Entry>>>,
}

impl InMemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across every scope
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Store a raw payload directly, bypassing the cast registry
    pub fn insert_raw(&self, filter: &EntryFilter, key: &str, payload: Json) {
        let now = chrono::Utc::now();
        self.data.write().insert(
            scoped_key(filter, key),
            Entry {
                key: key.to_string(),
                group: filter.group().to_string(),
                owner: filter.owner().cloned(),
                payload,
                created_at: now,
                updated_at: now,
            },
        );
    }

    fn in_scope(&self, filter: &EntryFilter) -> Vec<Entry> {
        self.data
            .read()
            .values()
            .filter(|entry| filter.matches(&entry.group, entry.owner.as_ref()))
            .filter(|entry| !filter.is_excepted(&entry.key))
            .cloned()
            .collect()
    }
}

fn scoped_key(filter: &EntryFilter, key: &str) -> ScopedKey {
    (
        key.to_string(),
        filter.group().to_string(),
        filter.owner().cloned(),
    )
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn get(
        &self,
        filter: &EntryFilter,
        keys: &[String],
    ) -> Result<IndexMap<String, Option<Json>>> {
        let data = self.data.read();
        Ok(keys
            .iter()
            .map(|key| {
                let payload = if filter.is_excepted(key) {
                    None
                } else {
                    data.get(&scoped_key(filter, key)).map(|entry| entry.payload.clone())
                };
                (key.clone(), payload)
            })
            .collect())
    }

    async fn all(&self, filter: &EntryFilter) -> Result<IndexMap<String, Json>> {
        // BTreeMap order is key-first, so entries come out sorted by key
        Ok(self
            .in_scope(filter)
            .into_iter()
            .map(|entry| (entry.key, entry.payload))
            .collect())
    }

    async fn set(&self, filter: &EntryFilter, entries: &[(String, Json)]) -> Result<()> {
        let now = chrono::Utc::now();
        let mut data = self.data.write();

        for (key, payload) in entries {
            data.entry(scoped_key(filter, key))
                .and_modify(|entry| {
                    entry.payload = payload.clone();
                    entry.updated_at = now;
                })
                .or_insert_with(|| Entry {
                    key: key.clone(),
                    group: filter.group().to_string(),
                    owner: filter.owner().cloned(),
                    payload: payload.clone(),
                    created_at: now,
                    updated_at: now,
                });
        }

        Ok(())
    }

    async fn forget(&self, filter: &EntryFilter, keys: &[String]) -> Result<()> {
        let mut data = self.data.write();
        for key in keys {
            data.remove(&scoped_key(filter, key));
        }
        Ok(())
    }

    async fn entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        Ok(self.in_scope(filter))
    }
}
