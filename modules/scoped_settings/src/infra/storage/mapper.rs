//! Entity to model mappers
//!
//! Conversions between SeaORM entities and contract models

use super::entity;
use crate::contract::{Entry, OwnerRef};
use crate::domain::EntryFilter;
use chrono::{DateTime, Utc};
use serde_json::Value as Json;

impl From<entity::Model> for Entry {
    fn from(entity: entity::Model) -> Self {
        let owner = match (entity.owner_type, entity.owner_id) {
            (Some(owner_type), Some(owner_id)) => Some(OwnerRef::new(owner_type, owner_id)),
            _ => None,
        };

        Self {
            key: entity.key,
            group: entity.group,
            owner,
            payload: entity.payload,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Active model for a new row under `filter`'s group and owner
pub fn new_active_model(
    filter: &EntryFilter,
    key: &str,
    payload: Json,
    now: DateTime<Utc>,
) -> entity::ActiveModel {
    use sea_orm::ActiveValue::*;

    let owner = filter.owner();
    entity::ActiveModel {
        id: NotSet,
        key: Set(key.to_string()),
        group: Set(filter.group().to_string()),
        owner_type: Set(owner.map(|o| o.owner_type.clone())),
        owner_id: Set(owner.map(|o| o.owner_id.clone())),
        payload: Set(payload),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveValue;
    use serde_json::json;

    #[test]
    fn test_model_without_owner_maps_to_global_entry() {
        let now = Utc::now();
        let entry: Entry = entity::Model {
            id: 1,
            key: "theme".to_string(),
            group: "default".to_string(),
            owner_type: None,
            owner_id: None,
            payload: json!({"$value": "dark", "$cast": null}),
            created_at: now,
            updated_at: now,
        }
        .into();

        assert!(entry.owner.is_none());
        assert_eq!(entry.payload["$value"], json!("dark"));
    }

    #[test]
    fn test_new_active_model_copies_scope() {
        let mut filter = EntryFilter::new();
        filter.set_group("ui");
        filter.set_owner_ref(OwnerRef::new("user", "42"));

        let active = new_active_model(&filter, "theme", json!(1), Utc::now());
        assert_eq!(active.group, ActiveValue::Set("ui".to_string()));
        assert_eq!(active.owner_type, ActiveValue::Set(Some("user".to_string())));
        assert_eq!(active.owner_id, ActiveValue::Set(Some("42".to_string())));
        assert!(matches!(active.id, ActiveValue::NotSet));
    }
}
