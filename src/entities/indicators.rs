use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "indicators")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    /// Polarity flag: `true` for a positive interest.
    #[sea_orm(column_name = "type")]
    pub positive: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_indicators::Entity")]
    UserIndicators,
    #[sea_orm(has_many = "super::event_indicators::Entity")]
    EventIndicators,
}

impl Related<super::user_indicators::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserIndicators.def()
    }
}

impl Related<super::event_indicators::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventIndicators.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
