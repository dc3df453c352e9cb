//! Scoped Settings Module
//!
//! Key-value settings scoped by group and owning entity, with values passed
//! through a pluggable cast layer so domain types survive storage.

// Public exports
pub mod contract;
pub use contract::{
    CastDirective, DatePeriod, Entry, OwnerRef, SettingsApi, SettingsError, Value, DEFAULT_GROUP,
};

pub mod config;
pub use config::Config;

pub mod domain;
pub use domain::{
    Cast, CastRegistry, EntryFilter, HasSettings, ScopedSettings, Settingable, Settings,
};

pub mod infra;
pub use infra::{InMemoryCache, InMemorySettingsRepository, SeaOrmSettingsRepository};

pub mod module;
pub use module::SettingsModule;
