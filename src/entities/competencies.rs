use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "competencies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_competencies::Entity")]
    UserCompetencies,
}

impl Related<super::user_competencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserCompetencies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
