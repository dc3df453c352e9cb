//! Stored payload tree and its reconstruction into domain values

use super::cast::{CastRegistry, ENVELOPE_CAST, ENVELOPE_VALUE};
use crate::contract::{SettingsError, Value};
use indexmap::IndexMap;
use serde_json::Value as Json;

/// Parsed form of a stored payload
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadNode {
    /// `{"$value": .., "$cast": ..}` produced by the cast registry
    Envelope { value: Json, cast: Option<String> },
    /// Bare scalar (written by something other than the registry)
    Scalar(Json),
    /// Array whose elements are reconstructed independently
    Sequence(Vec<PayloadNode>),
    /// Object that is not an envelope
    Mapping(IndexMap<String, PayloadNode>),
}

impl PayloadNode {
    /// Classify a stored JSON payload.
    ///
    /// An object is an envelope when it carries both markers and `$cast` is
    /// a string or null. Other objects are plain mappings.
    pub fn parse(json: Json) -> Self {
        match json {
            Json::Array(items) => Self::Sequence(items.into_iter().map(Self::parse).collect()),
            Json::Object(mut map) => {
                let is_envelope = map.contains_key(ENVELOPE_VALUE)
                    && matches!(map.get(ENVELOPE_CAST), Some(Json::String(_) | Json::Null));

                if is_envelope {
                    let cast = match map.remove(ENVELOPE_CAST) {
                        Some(Json::String(cast)) => Some(cast),
                        _ => None,
                    };
                    let value = map.remove(ENVELOPE_VALUE).unwrap_or(Json::Null);
                    Self::Envelope { value, cast }
                } else {
                    Self::Mapping(map.into_iter().map(|(k, v)| (k, Self::parse(v))).collect())
                }
            }
            scalar => Self::Scalar(scalar),
        }
    }

    /// Rebuild the domain value, depth-first.
    ///
    /// An envelope's `$value` is handed over whole: to its cast when one is
    /// named, verbatim otherwise.
    pub fn reconstruct(self, casts: &CastRegistry) -> Result<Value, SettingsError> {
        match self {
            Self::Envelope { value, cast: None } => Ok(Value::from(value)),
            Self::Envelope {
                value,
                cast: Some(cast_type),
            } => casts.resolve(&cast_type)?.get(&value),
            Self::Scalar(json) => Ok(Value::from(json)),
            Self::Sequence(items) => items
                .into_iter()
                .map(|item| item.reconstruct(casts))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Self::Mapping(map) => map
                .into_iter()
                .map(|(key, item)| Ok((key, item.reconstruct(casts)?)))
                .collect::<Result<IndexMap<_, _>, SettingsError>>()
                .map(Value::Map),
        }
    }
}

/// Parse and reconstruct a raw stored payload
pub fn reconstruct(json: Json, casts: &CastRegistry) -> Result<Value, SettingsError> {
    PayloadNode::parse(json).reconstruct(casts)
}
