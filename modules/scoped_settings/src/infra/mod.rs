//! Infrastructure layer - storage and cache collaborators

pub mod cache;
pub mod storage;

pub use cache::InMemoryCache;
pub use storage::{InMemorySettingsRepository, SeaOrmSettingsRepository};
