//! Contract models for scoped settings
//!
//! These models are transport-agnostic and used by every layer.
//! NO serde derives - stored representations are produced by the cast layer.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Number, Value as Json};

/// Group used when the caller does not pick one
pub const DEFAULT_GROUP: &str = "default";

/// A settings value as seen by callers.
///
/// Plain variants mirror JSON. `DateTime` and `Period` are domain types that
/// only survive storage through a registered cast. `Cast` is an explicit
/// directive asking for a specific cast regardless of the value's kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    DateTime(DateTime<FixedOffset>),
    Period(DatePeriod),
    Cast(CastDirective),
}

/// Explicit request to store `value` through the cast registered as `cast`
#[derive(Debug, Clone, PartialEq)]
pub struct CastDirective {
    /// Cast-type identifier
    pub cast: String,
    /// Value handed to the cast's `set`
    pub value: Box<Value>,
}

/// Closed date-time range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatePeriod {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl DatePeriod {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { start, end }
    }

    /// Whether `instant` falls inside the range (both ends inclusive)
    pub fn contains(&self, instant: &DateTime<FixedOffset>) -> bool {
        *instant >= self.start && *instant <= self.end
    }
}

/// Stable back-reference to the entity owning a settings entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerRef {
    /// Stable type identifier (e.g. "user", "app::Team")
    pub owner_type: String,
    /// Identity key of the entity within its type
    pub owner_id: String,
}

impl OwnerRef {
    pub fn new(owner_type: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id: owner_id.into(),
        }
    }
}

/// One persisted scoped key/payload record
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Settings key
    pub key: String,
    /// Group name
    pub group: String,
    /// Owning entity, `None` for global entries
    pub owner: Option<OwnerRef>,
    /// Serialized payload (envelopes and containers)
    pub payload: Json,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// RFC 3339 rendering used for date-times everywhere a string is needed
pub fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

impl Value {
    /// Wrap `value` in an explicit cast directive
    pub fn cast(cast: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Cast(CastDirective {
            cast: cast.into(),
            value: Box::new(value.into()),
        })
    }

    /// Concrete type identifier, used for type-based cast mapping
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::DateTime(_) => "datetime",
            Self::Period(_) => "period",
            Self::Cast(_) => "cast",
        }
    }

    /// Lower the value into plain JSON without consulting any cast.
    ///
    /// Lossy for domain types: date-times become strings and periods become
    /// `{"start", "end"}` objects.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => Json::Number(n.clone()),
            Self::String(s) => Json::String(s.clone()),
            Self::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Self::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::DateTime(dt) => Json::String(format_datetime(dt)),
            Self::Period(period) => serde_json::json!({
                "start": format_datetime(&period.start),
                "end": format_datetime(&period.end),
            }),
            Self::Cast(directive) => directive.value.to_json(),
        }
    }

    /// Build a value from any serializable type
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    /// Deserialize the plain JSON form of this value into `T`
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_period(&self) -> Option<&DatePeriod> {
        match self {
            Self::Period(period) => Some(period),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a field of a `Map` value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => Self::Number(n),
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::Null, Self::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt.fixed_offset())
    }
}

impl From<DatePeriod> for Value {
    fn from(period: DatePeriod) -> Self {
        Self::Period(period)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion_keeps_structure() {
        let json = json!({"theme": "dark", "sizes": [1, 2, 3], "beta": true, "none": null});
        let value = Value::from(json.clone());

        assert_eq!(value.get("theme"), Some(&Value::from("dark")));
        assert_eq!(value.get("sizes").and_then(Value::as_list).map(<[Value]>::len), Some(3));
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(1).kind(), "number");
        assert_eq!(Value::from(Utc::now()).kind(), "datetime");
        assert_eq!(Value::cast("money", 10).kind(), "cast");
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert!(Value::from(f64::NAN).is_null());
        assert_eq!(Value::from(1.5).as_f64(), Some(1.5));
    }

    #[test]
    fn test_serde_bridge() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Notifications {
            email: bool,
            digest_hour: u8,
        }

        let original = Notifications {
            email: true,
            digest_hour: 7,
        };
        let value = Value::from_serialize(&original).unwrap();
        assert_eq!(value.get("digest_hour").and_then(Value::as_i64), Some(7));

        let back: Notifications = value.deserialize_into().unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_period_contains() {
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap();
        let end = DateTime::parse_from_rfc3339("2024-01-31T00:00:00+00:00").unwrap();
        let inside = DateTime::parse_from_rfc3339("2024-01-15T12:00:00+02:00").unwrap();
        let period = DatePeriod::new(start, end);

        assert!(period.contains(&inside));
        assert!(!period.contains(&DateTime::parse_from_rfc3339("2024-02-01T00:00:00Z").unwrap()));
    }
}
