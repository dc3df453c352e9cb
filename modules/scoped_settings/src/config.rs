//! Configuration for the scoped settings module

use crate::domain::cast::{DATETIME_CAST, PERIOD_CAST};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Scoped settings configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Read cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Storage connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Cast-type identifier -> handler binding, layered over the built-in bindings
    #[serde(default = "default_casts", deserialize_with = "with_default_casts")]
    pub casts: BTreeMap<String, CastConfig>,

    /// Value kind -> cast-type identifier applied automatically on write,
    /// layered over the built-in mappings
    #[serde(default = "default_types", deserialize_with = "with_default_types")]
    pub types: BTreeMap<String, String>,
}

/// Read cache configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache reads forever and invalidate on writes
    #[serde(default)]
    pub enabled: bool,

    /// Prepended to every cache key
    #[serde(default)]
    pub prefix: String,
}

/// Storage connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URL (postgres:// or sqlite:)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Pool size override
    #[serde(default)]
    pub max_connections: Option<u32>,
}

/// Binding of one cast-type identifier to a handler
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CastConfig {
    /// Handler name registered with the cast registry builder
    pub handler: String,

    /// Parameters passed to the handler factory
    #[serde(default)]
    pub params: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            database: DatabaseConfig::default(),
            casts: default_casts(),
            types: default_types(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: None,
        }
    }
}

impl Config {
    /// Parse configuration from YAML; omitted sections take their defaults
    pub fn from_yaml(source: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_casts() -> BTreeMap<String, CastConfig> {
    [DATETIME_CAST, PERIOD_CAST]
        .into_iter()
        .map(|name| {
            (
                name.to_string(),
                CastConfig {
                    handler: name.to_string(),
                    params: Vec::new(),
                },
            )
        })
        .collect()
}

fn with_default_casts<'de, D>(deserializer: D) -> Result<BTreeMap<String, CastConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut casts = default_casts();
    casts.extend(BTreeMap::<String, CastConfig>::deserialize(deserializer)?);
    Ok(casts)
}

fn with_default_types<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut types = default_types();
    types.extend(BTreeMap::<String, String>::deserialize(deserializer)?);
    Ok(types)
}

fn default_types() -> BTreeMap<String, String> {
    [("datetime", DATETIME_CAST), ("period", PERIOD_CAST)]
        .into_iter()
        .map(|(kind, cast)| (kind.to_string(), cast.to_string()))
        .collect()
}
