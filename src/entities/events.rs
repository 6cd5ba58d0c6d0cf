use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// `%Y-%m-%d %H:%M:%S`
    pub date: String,

    pub address: String,

    pub description: String,

    pub organizer_id: i32,

    pub verified: bool,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OrganizerId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Organizer,
    #[sea_orm(has_many = "super::event_indicators::Entity")]
    EventIndicators,
    #[sea_orm(has_one = "super::event_pictures::Entity")]
    EventPictures,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizer.def()
    }
}

impl Related<super::event_indicators::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventIndicators.def()
    }
}

impl Related<super::event_pictures::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventPictures.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
