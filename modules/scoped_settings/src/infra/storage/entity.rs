//! SeaORM entity for the settings table

use sea_orm::entity::prelude::*;

/// Settings table entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    /// Surrogate key; the scoped tuple has nullable parts
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Settings key
    pub key: String,

    /// Group name
    pub group: String,

    /// Owner type identifier, NULL for global entries
    pub owner_type: Option<String>,

    /// Owner identity key, NULL for global entries
    pub owner_id: Option<String>,

    /// Payload produced by the cast registry
    pub payload: Json,

    /// Creation timestamp
    pub created_at: DateTimeUtc,

    /// Last update timestamp
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
