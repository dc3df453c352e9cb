//! Common test utilities: owners, casts and a read-counting repository
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use scoped_settings::config::{CacheConfig, Config};
use scoped_settings::domain::SettingsRepository;
use scoped_settings::{
    Cast, CastRegistry, Entry, EntryFilter, InMemoryCache, InMemorySettingsRepository,
    Settingable, Settings, SettingsError, Value,
};
use serde_json::Value as Json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Route `tracing` output through the test harness; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("scoped_settings=debug")
        .with_test_writer()
        .try_init();
}

pub fn print_test_header(test_name: &str, purpose: &str) {
    println!("\n🧪 TEST: {}", test_name);
    println!("📋 PURPOSE: {}", purpose);
}

/// Persisted user (or an unsaved one when `id` is `None`)
pub struct User {
    pub id: Option<u64>,
}

impl User {
    pub fn saved(id: u64) -> Self {
        Self { id: Some(id) }
    }
}

impl Settingable for User {
    fn owner_type(&self) -> &str {
        "user"
    }

    fn owner_key(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }
}

pub struct Team {
    pub slug: String,
}

impl Settingable for Team {
    fn owner_type(&self) -> &str {
        "team"
    }

    fn owner_key(&self) -> Option<String> {
        Some(self.slug.clone())
    }
}

/// Always stores and returns the same marker
pub struct DummyCast;

impl Cast for DummyCast {
    fn set(&self, _value: &Value) -> Result<Json, SettingsError> {
        Ok(Json::String("dummy value".to_string()))
    }

    fn get(&self, _stored: &Json) -> Result<Value, SettingsError> {
        Ok(Value::from("dummy value"))
    }
}

/// Registry as configured by default, plus the `dummy` cast
pub fn test_casts() -> CastRegistry {
    let config = Config::default();
    CastRegistry::builder()
        .register("dummy", DummyCast)
        .configure(&config.casts, &config.types)
        .unwrap()
        .build()
}

/// In-memory repository that counts how often storage is read and written
#[derive(Clone, Default)]
pub struct CountingRepo {
    pub inner: InMemorySettingsRepository,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl CountingRepo {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsRepository for CountingRepo {
    async fn get(
        &self,
        filter: &EntryFilter,
        keys: &[String],
    ) -> Result<IndexMap<String, Option<Json>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(filter, keys).await
    }

    async fn all(&self, filter: &EntryFilter) -> Result<IndexMap<String, Json>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.all(filter).await
    }

    async fn set(&self, filter: &EntryFilter, entries: &[(String, Json)]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(filter, entries).await
    }

    async fn forget(&self, filter: &EntryFilter, keys: &[String]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.forget(filter, keys).await
    }

    async fn entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        self.inner.entries(filter).await
    }
}

/// Repository whose every call fails, for error propagation tests
pub struct FailingRepo;

#[async_trait]
impl SettingsRepository for FailingRepo {
    async fn get(&self, _: &EntryFilter, _: &[String]) -> Result<IndexMap<String, Option<Json>>> {
        anyhow::bail!("connection refused")
    }

    async fn all(&self, _: &EntryFilter) -> Result<IndexMap<String, Json>> {
        anyhow::bail!("connection refused")
    }

    async fn set(&self, _: &EntryFilter, _: &[(String, Json)]) -> Result<()> {
        anyhow::bail!("connection refused")
    }

    async fn forget(&self, _: &EntryFilter, _: &[String]) -> Result<()> {
        anyhow::bail!("connection refused")
    }

    async fn entries(&self, _: &EntryFilter) -> Result<Vec<Entry>> {
        anyhow::bail!("connection refused")
    }
}

pub struct Harness {
    pub settings: Settings,
    pub repo: CountingRepo,
    pub cache: Arc<InMemoryCache>,
}

pub fn harness(cache_enabled: bool) -> Harness {
    init_tracing();
    let repo = CountingRepo::default();
    let cache = Arc::new(InMemoryCache::new());
    let settings = Settings::new(
        Arc::new(repo.clone()),
        cache.clone(),
        Arc::new(test_casts()),
        CacheConfig {
            enabled: cache_enabled,
            prefix: "test.".to_string(),
        },
    );

    Harness {
        settings,
        repo,
        cache,
    }
}
