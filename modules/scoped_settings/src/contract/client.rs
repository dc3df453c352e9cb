//! Settings API trait
//!
//! The injectable façade. Every call receives its scope as an owned
//! [`EntryFilter`], so no scope state can survive from one call to the next.

use super::{error::SettingsError, model::Value};
use crate::domain::filter::EntryFilter;
use async_trait::async_trait;
use indexmap::IndexMap;

/// Scoped settings API
#[async_trait]
pub trait SettingsApi: Send + Sync {
    /// Get one key, falling back to `default` when it is not stored
    async fn get(
        &self,
        filter: EntryFilter,
        key: &str,
        default: Value,
    ) -> Result<Value, SettingsError>;

    /// Get several keys; every requested key is present in the result
    async fn get_many(
        &self,
        filter: EntryFilter,
        keys: &[String],
        default: Value,
    ) -> Result<IndexMap<String, Value>, SettingsError>;

    /// Store one key
    async fn set(&self, filter: EntryFilter, key: &str, value: Value)
        -> Result<(), SettingsError>;

    /// Store several keys, each cast independently
    async fn set_many(
        &self,
        filter: EntryFilter,
        values: IndexMap<String, Value>,
    ) -> Result<(), SettingsError>;

    /// Delete keys within the scope; missing keys are ignored
    async fn forget(&self, filter: EntryFilter, keys: &[String]) -> Result<(), SettingsError>;

    /// Every entry in the scope except the filter's excluded keys
    async fn all(&self, filter: EntryFilter) -> Result<IndexMap<String, Value>, SettingsError>;

    /// Whether `key` resolves to a non-null value.
    ///
    /// A key stored with a `null` value is reported as absent.
    async fn exists(&self, filter: EntryFilter, key: &str) -> Result<bool, SettingsError> {
        Ok(!self.get(filter, key, Value::Null).await?.is_null())
    }
}
