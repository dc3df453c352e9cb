//! Domain layer - casting, scoping, caching and the settings manager

pub mod cache;
pub mod cast;
pub mod filter;
pub mod payload;
pub mod repository;
pub mod scoped;
pub mod service;

pub use cache::{CacheStore, KeySelection};
pub use cast::{Cast, CastRegistry, CastRegistryBuilder};
pub use filter::{EntryFilter, Settingable};
pub use payload::PayloadNode;
pub use repository::SettingsRepository;
pub use scoped::{HasSettings, ScopedSettings};
pub use service::Settings;
