use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QueryOrder};

use crate::entities::{competencies, prelude::*, roles, universities};

/// Read-only reference tables.
pub struct ReferenceRepository {
    conn: DatabaseConnection,
}

impl ReferenceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn roles(&self) -> Result<Vec<roles::Model>, DbErr> {
        Roles::find()
            .order_by_asc(roles::Column::Id)
            .all(&self.conn)
            .await
    }

    pub async fn universities(&self) -> Result<Vec<universities::Model>, DbErr> {
        Universities::find()
            .order_by_asc(universities::Column::Id)
            .all(&self.conn)
            .await
    }

    pub async fn competencies(&self) -> Result<Vec<competencies::Model>, DbErr> {
        Competencies::find()
            .order_by_asc(competencies::Column::Id)
            .all(&self.conn)
            .await
    }
}
