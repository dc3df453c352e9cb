//! Chainable scope builder
//!
//! Terminal operations consume the builder, so the scope configured for one
//! call is dropped with it and cannot leak into the next.

use super::filter::{EntryFilter, Settingable};
use crate::contract::{OwnerRef, SettingsApi, SettingsError, Value};
use indexmap::IndexMap;

/// Settings access narrowed to a group, an owner and a set of excluded keys
pub struct ScopedSettings<'a> {
    api: &'a dyn SettingsApi,
    filter: EntryFilter,
}

impl<'a> ScopedSettings<'a> {
    pub fn new(api: &'a dyn SettingsApi) -> Self {
        Self {
            api,
            filter: EntryFilter::default(),
        }
    }

    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.filter.set_group(name);
        self
    }

    /// Scope to entries owned by `owner`; rejects owners without identity right away
    pub fn for_owner<O: Settingable + ?Sized>(mut self, owner: &O) -> Result<Self, SettingsError> {
        self.filter.set_owner(owner)?;
        Ok(self)
    }

    pub fn for_owner_ref(mut self, owner: OwnerRef) -> Self {
        self.filter.set_owner_ref(owner);
        self
    }

    /// Exclude keys from `all` and multi-key reads; replaces earlier exclusions
    pub fn except<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.set_excepts(keys);
        self
    }

    pub fn filter(&self) -> &EntryFilter {
        &self.filter
    }

    /// Value of `key`, `Null` when absent
    pub async fn get(self, key: &str) -> Result<Value, SettingsError> {
        self.api.get(self.filter, key, Value::Null).await
    }

    /// Value of `key`, `default` when absent
    pub async fn get_or(self, key: &str, default: impl Into<Value>) -> Result<Value, SettingsError> {
        self.api.get(self.filter, key, default.into()).await
    }

    /// Values of `keys`, `Null` for absent ones
    pub async fn get_many<I, S>(self, keys: I) -> Result<IndexMap<String, Value>, SettingsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.get_many_or(keys, Value::Null).await
    }

    /// Values of `keys`, `default` for absent ones
    pub async fn get_many_or<I, S>(
        self,
        keys: I,
        default: impl Into<Value>,
    ) -> Result<IndexMap<String, Value>, SettingsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        self.api.get_many(self.filter, &keys, default.into()).await
    }

    pub async fn set(self, key: &str, value: impl Into<Value>) -> Result<(), SettingsError> {
        self.api.set(self.filter, key, value.into()).await
    }

    pub async fn set_many<I, K, V>(self, values: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let values: IndexMap<String, Value> = values
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.api.set_many(self.filter, values).await
    }

    pub async fn forget(self, key: &str) -> Result<(), SettingsError> {
        self.api.forget(self.filter, &[key.to_string()]).await
    }

    pub async fn forget_many<I, S>(self, keys: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        self.api.forget(self.filter, &keys).await
    }

    pub async fn all(self) -> Result<IndexMap<String, Value>, SettingsError> {
        self.api.all(self.filter).await
    }

    /// Whether `key` holds a non-null value; a stored `null` counts as absent
    pub async fn exists(self, key: &str) -> Result<bool, SettingsError> {
        self.api.exists(self.filter, key).await
    }
}

/// Settings access for owning entities
pub trait HasSettings: Settingable {
    /// Builder already scoped to this entity
    fn settings<'a>(&self, api: &'a dyn SettingsApi) -> Result<ScopedSettings<'a>, SettingsError> {
        ScopedSettings::new(api).for_owner(self)
    }
}

impl<T: Settingable + ?Sized> HasSettings for T {}
