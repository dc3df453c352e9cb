//! Repository trait for settings storage
//!
//! Every operation is scoped by the given [`EntryFilter`]: group equality and
//! owner equality, where a filter without owner only sees global entries.
//! Implementations store and return raw payloads; casting happens above them.

use super::filter::EntryFilter;
use crate::contract::Entry;
use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value as Json;

/// Storage backend for scoped settings entries
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Payloads for `keys` in request order; absent or excepted keys map to `None`
    async fn get(&self, filter: &EntryFilter, keys: &[String]) -> Result<IndexMap<String, Option<Json>>>;

    /// Every entry in scope, ordered by key, excepted keys left out
    async fn all(&self, filter: &EntryFilter) -> Result<IndexMap<String, Json>>;

    /// Upsert each `(key, payload)` on `(key, group, owner_type, owner_id)`
    async fn set(&self, filter: &EntryFilter, entries: &[(String, Json)]) -> Result<()>;

    /// Delete `keys` within the scope; missing keys are a no-op
    async fn forget(&self, filter: &EntryFilter, keys: &[String]) -> Result<()>;

    /// Full rows in scope, ordered by key
    async fn entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>>;
}
