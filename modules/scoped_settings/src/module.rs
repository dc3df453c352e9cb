//! Module bootstrap: connection, migrations and manager wiring

use crate::config::{Config, DatabaseConfig};
use crate::domain::{CastRegistry, CastRegistryBuilder, Settings};
use crate::infra::{InMemoryCache, SeaOrmSettingsRepository};
use anyhow::Result;
use parking_lot::RwLock;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::sync::Arc;

/// Scoped settings module
pub struct SettingsModule {
    config: RwLock<Config>,
    settings: RwLock<Option<Arc<Settings>>>,
}

impl Default for SettingsModule {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl SettingsModule {
    pub fn new(config: Config) -> Self {
        Self {
            config: RwLock::new(config),
            settings: RwLock::new(None),
        }
    }

    /// Connect to the configured database and wire the manager with built-in casts
    pub async fn init(&self) -> Result<Arc<Settings>> {
        let database = self.config.read().database.clone();
        let db = connect(&database).await?;
        self.init_with(db, CastRegistry::builder()).await
    }

    /// Wire the manager on an existing connection.
    ///
    /// `casts` carries any extra handler names the host registers; the
    /// configured bindings are resolved against it here, so an unknown
    /// handler fails initialization.
    pub async fn init_with(
        &self,
        db: DatabaseConnection,
        casts: CastRegistryBuilder,
    ) -> Result<Arc<Settings>> {
        let cfg = self.config.read().clone();

        self.migrate(&db).await?;

        let registry = Arc::new(casts.configure(&cfg.casts, &cfg.types)?.build());
        let repository = Arc::new(SeaOrmSettingsRepository::new(Arc::new(db)));
        let cache = Arc::new(InMemoryCache::new());

        let settings = Arc::new(Settings::new(repository, cache, registry, cfg.cache.clone()));
        *self.settings.write() = Some(settings.clone());

        tracing::info!(
            cache_enabled = cfg.cache.enabled,
            casts = cfg.casts.len(),
            "Scoped settings initialized"
        );
        Ok(settings)
    }

    /// Run pending migrations
    pub async fn migrate(&self, db: &DatabaseConnection) -> Result<()> {
        use crate::infra::storage::migrations::Migrator;
        use sea_orm_migration::MigratorTrait;

        Migrator::up(db, None).await?;
        tracing::info!("Scoped settings migrations completed");
        Ok(())
    }

    /// The manager built by `init`
    pub fn settings(&self) -> Result<Arc<Settings>> {
        self.settings
            .read()
            .as_ref()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Settings not initialized"))
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }
}

/// Open the configured database connection
pub async fn connect(cfg: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(cfg.url.clone());

    // Every pooled connection to an in-memory SQLite database sees its own database
    if cfg.url.contains(":memory:") {
        options.max_connections(1);
    } else if let Some(max) = cfg.max_connections {
        options.max_connections(max);
    }
    options.sqlx_logging(false);

    let db = Database::connect(options).await?;
    tracing::debug!(backend = ?db.get_database_backend(), "Settings database connected");
    Ok(db)
}
