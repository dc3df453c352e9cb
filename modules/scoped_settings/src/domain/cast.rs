//! Cast registry - turns domain values into storage-safe payloads and back
//!
//! A cast is registered under a cast-type identifier. Identifiers are bound to
//! implementations when the registry is built, so a configuration naming an
//! unknown handler fails at startup rather than on the first write.

use crate::config::CastConfig;
use crate::contract::model::format_datetime;
use crate::contract::{DatePeriod, SettingsError, Value};
use chrono::DateTime;
use serde_json::{json, Value as Json};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Envelope field holding the cast's storage representation
pub const ENVELOPE_VALUE: &str = "$value";
/// Envelope field holding the cast-type identifier (or null)
pub const ENVELOPE_CAST: &str = "$cast";

/// Built-in handler and cast-type name for date-times
pub const DATETIME_CAST: &str = "datetime";
/// Built-in handler and cast-type name for date periods
pub const PERIOD_CAST: &str = "period";

/// Bidirectional transform between a domain value and its stored form
pub trait Cast: Send + Sync {
    /// Produce the storage representation of `value`
    fn set(&self, value: &Value) -> Result<Json, SettingsError>;

    /// Rebuild the domain value from its storage representation
    fn get(&self, stored: &Json) -> Result<Value, SettingsError>;
}

/// Builds a cast from the string parameters given in configuration
pub type CastFactory = Arc<dyn Fn(&[String]) -> Arc<dyn Cast> + Send + Sync>;

/// Wrap a stored representation in a `{"$value", "$cast"}` envelope
pub fn envelope(value: Json, cast: Option<&str>) -> Json {
    json!({
        ENVELOPE_VALUE: value,
        ENVELOPE_CAST: cast,
    })
}

// ===== Built-in casts =====

/// Date-time <-> RFC 3339 string, sub-second precision preserved
pub struct DateTimeCast;

impl Cast for DateTimeCast {
    fn set(&self, value: &Value) -> Result<Json, SettingsError> {
        match value {
            Value::DateTime(dt) => Ok(Json::String(format_datetime(dt))),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| Json::String(format_datetime(&dt)))
                .map_err(|e| SettingsError::cast_failed(DATETIME_CAST, e)),
            other => Err(SettingsError::cast_failed(
                DATETIME_CAST,
                format!("expected a date-time, got {}", other.kind()),
            )),
        }
    }

    fn get(&self, stored: &Json) -> Result<Value, SettingsError> {
        let raw = stored.as_str().ok_or_else(|| {
            SettingsError::cast_failed(DATETIME_CAST, "stored value is not a string")
        })?;

        DateTime::parse_from_rfc3339(raw)
            .map(Value::DateTime)
            .map_err(|e| SettingsError::cast_failed(DATETIME_CAST, e))
    }
}

/// Date period <-> `{"start": <rfc3339>, "end": <rfc3339>}`
pub struct PeriodCast;

impl Cast for PeriodCast {
    fn set(&self, value: &Value) -> Result<Json, SettingsError> {
        match value {
            Value::Period(period) => Ok(json!({
                "start": format_datetime(&period.start),
                "end": format_datetime(&period.end),
            })),
            other => Err(SettingsError::cast_failed(
                PERIOD_CAST,
                format!("expected a period, got {}", other.kind()),
            )),
        }
    }

    fn get(&self, stored: &Json) -> Result<Value, SettingsError> {
        let bound = |name: &str| {
            let raw = stored.get(name).and_then(Json::as_str).ok_or_else(|| {
                SettingsError::cast_failed(PERIOD_CAST, format!("missing '{name}' bound"))
            })?;
            DateTime::parse_from_rfc3339(raw).map_err(|e| SettingsError::cast_failed(PERIOD_CAST, e))
        };

        Ok(Value::Period(DatePeriod::new(bound("start")?, bound("end")?)))
    }
}

// ===== Registry =====

/// Cast-type identifier -> cast implementation, plus value kind -> cast-type
#[derive(Clone, Default)]
pub struct CastRegistry {
    casts: HashMap<String, Arc<dyn Cast>>,
    types: HashMap<String, String>,
}

impl fmt::Debug for CastRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut casts: Vec<_> = self.casts.keys().collect();
        casts.sort();
        f.debug_struct("CastRegistry")
            .field("casts", &casts)
            .field("types", &self.types)
            .finish()
    }
}

impl CastRegistry {
    /// Builder preloaded with the built-in handler names
    pub fn builder() -> CastRegistryBuilder {
        CastRegistryBuilder::default()
    }

    /// Registry built from configuration with the built-in handlers only
    pub fn from_config(
        casts: &BTreeMap<String, CastConfig>,
        types: &BTreeMap<String, String>,
    ) -> Result<Self, SettingsError> {
        Ok(Self::builder().configure(casts, types)?.build())
    }

    /// Find the cast registered under `cast_type`
    pub fn resolve(&self, cast_type: &str) -> Result<&Arc<dyn Cast>, SettingsError> {
        self.casts
            .get(cast_type)
            .ok_or_else(|| SettingsError::missing_handler(cast_type))
    }

    pub fn contains(&self, cast_type: &str) -> bool {
        self.casts.contains_key(cast_type)
    }

    /// Cast-type mapped to a value kind, if any
    pub fn cast_for_kind(&self, kind: &str) -> Option<&str> {
        self.types.get(kind).map(String::as_str)
    }

    /// Produce the storage payload for `value`.
    ///
    /// Lists and maps are walked element by element and never enveloped
    /// themselves, so nested values keep their own casts.
    pub fn handle(&self, value: &Value) -> Result<Json, SettingsError> {
        match value {
            Value::Cast(directive) => self.apply(&directive.cast, &directive.value),
            Value::List(items) => items
                .iter()
                .map(|item| self.handle(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            Value::Map(map) => map
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.handle(item)?)))
                .collect::<Result<serde_json::Map<_, _>, SettingsError>>()
                .map(Json::Object),
            other => match self.cast_for_kind(other.kind()) {
                Some(cast_type) => self.apply(cast_type, other),
                None => Ok(envelope(other.to_json(), None)),
            },
        }
    }

    fn apply(&self, cast_type: &str, value: &Value) -> Result<Json, SettingsError> {
        let stored = self.resolve(cast_type)?.set(value)?;
        Ok(envelope(stored, Some(cast_type)))
    }
}

/// Collects handlers, casts and type mappings before freezing them
pub struct CastRegistryBuilder {
    handlers: HashMap<String, CastFactory>,
    casts: HashMap<String, Arc<dyn Cast>>,
    types: HashMap<String, String>,
}

impl Default for CastRegistryBuilder {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            casts: HashMap::new(),
            types: HashMap::new(),
        }
        .handler(DATETIME_CAST, |_| Arc::new(DateTimeCast) as Arc<dyn Cast>)
        .handler(PERIOD_CAST, |_| Arc::new(PeriodCast) as Arc<dyn Cast>)
    }
}

impl CastRegistryBuilder {
    /// Make a handler name available to configuration
    pub fn handler<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&[String]) -> Arc<dyn Cast> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register a ready-made cast under `cast_type`
    pub fn register(mut self, cast_type: impl Into<String>, cast: impl Cast + 'static) -> Self {
        self.casts.insert(cast_type.into(), Arc::new(cast));
        self
    }

    /// Route values of `kind` through the cast registered as `cast_type`
    pub fn map_type(mut self, kind: impl Into<String>, cast_type: impl Into<String>) -> Self {
        self.types.insert(kind.into(), cast_type.into());
        self
    }

    /// Bind `cast_type` to the handler named `handler`, built with `params`
    pub fn cast_with(
        mut self,
        cast_type: impl Into<String>,
        handler: &str,
        params: &[String],
    ) -> Result<Self, SettingsError> {
        let factory = self
            .handlers
            .get(handler)
            .ok_or_else(|| SettingsError::invalid_handler(handler))?;
        let cast = factory(params);
        self.casts.insert(cast_type.into(), cast);
        Ok(self)
    }

    /// Apply the `casts` and `types` sections of the configuration.
    ///
    /// Every type mapping must target a cast registered by now.
    pub fn configure(
        mut self,
        casts: &BTreeMap<String, CastConfig>,
        types: &BTreeMap<String, String>,
    ) -> Result<Self, SettingsError> {
        for (cast_type, cfg) in casts {
            self = self.cast_with(cast_type.as_str(), &cfg.handler, &cfg.params)?;
        }
        for (kind, cast_type) in types {
            if !self.casts.contains_key(cast_type) {
                return Err(SettingsError::invalid_handler(cast_type.as_str()));
            }
            self = self.map_type(kind.as_str(), cast_type.as_str());
        }
        Ok(self)
    }

    pub fn build(self) -> CastRegistry {
        tracing::debug!(
            casts = self.casts.len(),
            types = self.types.len(),
            "Cast registry built"
        );
        CastRegistry {
            casts: self.casts,
            types: self.types,
        }
    }
}
