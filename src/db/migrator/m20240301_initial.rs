use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{EntityTrait, Schema};

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create<E>(manager: &SchemaManager<'_>, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    manager
        .create_table(
            schema
                .create_table_from_entity(entity)
                .if_not_exists()
                .to_owned(),
        )
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        // Parents before children so foreign keys resolve.
        create(manager, &schema, Roles).await?;
        create(manager, &schema, Universities).await?;
        create(manager, &schema, Competencies).await?;
        create(manager, &schema, Indicators).await?;
        create(manager, &schema, Users).await?;
        create(manager, &schema, ApiKeys).await?;
        create(manager, &schema, UserIndicators).await?;
        create(manager, &schema, Events).await?;
        create(manager, &schema, EventIndicators).await?;
        create(manager, &schema, EventPictures).await?;
        create(manager, &schema, UserCompetencies).await?;
        create(manager, &schema, UserPreferenceCompetencies).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserPreferenceCompetencies).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserCompetencies).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EventPictures).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EventIndicators).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserIndicators).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApiKeys).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Indicators).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Competencies).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Universities).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles).to_owned())
            .await?;

        Ok(())
    }
}
