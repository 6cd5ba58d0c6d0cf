use crate::entities::{competencies, indicators, prelude::*, roles, universities};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const ROLES: [(i32, &str); 3] = [(1, "Student"), (2, "Organizer"), (3, "Assessor")];

const UNIVERSITIES: [(i32, &str); 5] = [
    (1, "State Technical University"),
    (2, "State University of Economics"),
    (3, "Medical Academy"),
    (4, "Pedagogical University"),
    (5, "Institute of Arts"),
];

const COMPETENCIES: [(i32, &str); 6] = [
    (1, "Teamwork"),
    (2, "Leadership"),
    (3, "Public speaking"),
    (4, "Project management"),
    (5, "Critical thinking"),
    (6, "Volunteering"),
];

/// (name, positive)
const INDICATORS: [(&str, bool); 10] = [
    ("Science", true),
    ("Sports", true),
    ("Music", true),
    ("Volunteering", true),
    ("Programming", true),
    ("Art", true),
    ("Crowded venues", false),
    ("Late hours", false),
    ("Outdoor activities", false),
    ("Paid entry", false),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert()
            .into_table(Roles)
            .columns([roles::Column::Id, roles::Column::Name])
            .to_owned();
        for (id, name) in ROLES {
            insert.values_panic([id.into(), name.into()]);
        }
        manager.exec_stmt(insert).await?;

        let mut insert = Query::insert()
            .into_table(Universities)
            .columns([universities::Column::Id, universities::Column::Name])
            .to_owned();
        for (id, name) in UNIVERSITIES {
            insert.values_panic([id.into(), name.into()]);
        }
        manager.exec_stmt(insert).await?;

        let mut insert = Query::insert()
            .into_table(Competencies)
            .columns([competencies::Column::Id, competencies::Column::Name])
            .to_owned();
        for (id, name) in COMPETENCIES {
            insert.values_panic([id.into(), name.into()]);
        }
        manager.exec_stmt(insert).await?;

        let mut insert = Query::insert()
            .into_table(Indicators)
            .columns([indicators::Column::Name, indicators::Column::Positive])
            .to_owned();
        for (name, positive) in INDICATORS {
            insert.values_panic([name.into(), positive.into()]);
        }
        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(Indicators).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Competencies).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Universities).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(Roles).to_owned())
            .await?;

        Ok(())
    }
}
