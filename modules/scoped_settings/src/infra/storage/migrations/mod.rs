//! Database migrations for scoped settings

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250101_000001_create_settings::Migration)]
    }
}

mod m20250101_000001_create_settings {
    use super::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Settings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Settings::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Settings::Key).string().not_null())
                        .col(ColumnDef::new(Settings::Group).string().not_null())
                        .col(ColumnDef::new(Settings::OwnerType).string().null())
                        .col(ColumnDef::new(Settings::OwnerId).string().null())
                        .col(ColumnDef::new(Settings::Payload).json().not_null())
                        .col(
                            ColumnDef::new(Settings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(Settings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;

            // Upserts look rows up by the full scoped tuple
            manager
                .create_index(
                    Index::create()
                        .name("idx_settings_scoped_key")
                        .table(Settings::Table)
                        .col(Settings::Key)
                        .col(Settings::Group)
                        .col(Settings::OwnerType)
                        .col(Settings::OwnerId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_settings_owner")
                        .table(Settings::Table)
                        .col(Settings::OwnerType)
                        .col(Settings::OwnerId)
                        .to_owned(),
                )
                .await?;

            // NULL owner columns never collide in the scoped index above
            manager
                .get_connection()
                .execute_unprepared(
                    r#"CREATE UNIQUE INDEX idx_settings_global_key ON settings ("key", "group") WHERE owner_type IS NULL AND owner_id IS NULL"#,
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Settings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Settings {
        Table,
        Id,
        Key,
        Group,
        OwnerType,
        OwnerId,
        Payload,
        CreatedAt,
        UpdatedAt,
    }
}
