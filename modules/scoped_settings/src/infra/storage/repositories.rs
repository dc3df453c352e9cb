//! SeaORM repository implementation

use crate::contract::Entry;
use crate::domain::{EntryFilter, SettingsRepository};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Select,
};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;

use super::{entity, mapper};

pub struct SeaOrmSettingsRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmSettingsRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find(&self, filter: &EntryFilter, key: &str) -> Result<Option<entity::Model>> {
        Ok(entity::Entity::find()
            .filter(scope_condition(filter))
            .filter(entity::Column::Key.eq(key))
            .one(&*self.db)
            .await?)
    }

    async fn update(&self, model: entity::Model, payload: &Json, now: DateTime<Utc>) -> Result<()> {
        let mut active: entity::ActiveModel = model.into();
        active.payload = Set(payload.clone());
        active.updated_at = Set(now);
        active.update(&*self.db).await?;
        Ok(())
    }

    async fn upsert(&self, filter: &EntryFilter, key: &str, payload: &Json) -> Result<()> {
        let now = Utc::now();

        if let Some(model) = self.find(filter, key).await? {
            return self.update(model, payload, now).await;
        }

        match mapper::new_active_model(filter, key, payload.clone(), now)
            .insert(&*self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                // A concurrent writer may have inserted the same scoped key first
                let Some(model) = self.find(filter, key).await? else {
                    return Err(err.into());
                };
                tracing::debug!(key, "Settings insert lost a race, updating instead");
                self.update(model, payload, now).await
            }
        }
    }
}

/// Group equality plus owner equality; no owner means both owner columns are NULL
fn scope_condition(filter: &EntryFilter) -> Condition {
    let owner = match filter.owner() {
        Some(owner) => Condition::all()
            .add(entity::Column::OwnerType.eq(owner.owner_type.as_str()))
            .add(entity::Column::OwnerId.eq(owner.owner_id.as_str())),
        None => Condition::all()
            .add(entity::Column::OwnerType.is_null())
            .add(entity::Column::OwnerId.is_null()),
    };

    Condition::all()
        .add(entity::Column::Group.eq(filter.group()))
        .add(owner)
}

/// Scoped query with the filter's excluded keys left out
fn scoped_query(filter: &EntryFilter) -> Select<entity::Entity> {
    let mut query = entity::Entity::find().filter(scope_condition(filter));

    if !filter.excepts().is_empty() {
        query = query.filter(entity::Column::Key.is_not_in(filter.excepts().iter().cloned()));
    }

    query
}

#[async_trait]
impl SettingsRepository for SeaOrmSettingsRepository {
    async fn get(
        &self,
        filter: &EntryFilter,
        keys: &[String],
    ) -> Result<IndexMap<String, Option<Json>>> {
        if keys.is_empty() {
            return Ok(IndexMap::new());
        }

        let found: HashMap<String, Json> = scoped_query(filter)
            .filter(entity::Column::Key.is_in(keys.iter().cloned()))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|model| (model.key, model.payload))
            .collect();

        Ok(keys
            .iter()
            .map(|key| (key.clone(), found.get(key).cloned()))
            .collect())
    }

    async fn all(&self, filter: &EntryFilter) -> Result<IndexMap<String, Json>> {
        let results = scoped_query(filter)
            .order_by_asc(entity::Column::Key)
            .all(&*self.db)
            .await?;

        Ok(results
            .into_iter()
            .map(|model| (model.key, model.payload))
            .collect())
    }

    async fn set(&self, filter: &EntryFilter, entries: &[(String, Json)]) -> Result<()> {
        for (key, payload) in entries {
            self.upsert(filter, key, payload).await?;
        }

        Ok(())
    }

    async fn forget(&self, filter: &EntryFilter, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let result = entity::Entity::delete_many()
            .filter(scope_condition(filter))
            .filter(entity::Column::Key.is_in(keys.iter().cloned()))
            .exec(&*self.db)
            .await?;

        tracing::debug!(deleted = result.rows_affected, "Settings entries deleted");
        Ok(())
    }

    async fn entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        let results = scoped_query(filter)
            .order_by_asc(entity::Column::Key)
            .all(&*self.db)
            .await?;

        Ok(results.into_iter().map(Into::into).collect())
    }
}
