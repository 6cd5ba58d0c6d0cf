use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::entities::{indicators, prelude::*, user_indicators};

pub struct IndicatorRepository {
    conn: DatabaseConnection,
}

impl IndicatorRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_all(&self) -> Result<Vec<indicators::Model>, DbErr> {
        Indicators::find()
            .order_by_asc(indicators::Column::Id)
            .all(&self.conn)
            .await
    }

    pub async fn get_by_ids(&self, ids: &[i32]) -> Result<Vec<indicators::Model>, DbErr> {
        Indicators::find()
            .filter(indicators::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(indicators::Column::Id)
            .all(&self.conn)
            .await
    }

    pub async fn add(&self, name: &str, positive: bool) -> Result<i32, DbErr> {
        let result = Indicators::insert(indicators::ActiveModel {
            name: Set(name.to_string()),
            positive: Set(positive),
            ..Default::default()
        })
        .exec(&self.conn)
        .await?;

        Ok(result.last_insert_id)
    }

    pub async fn for_user(&self, user_id: i32) -> Result<Vec<indicators::Model>, DbErr> {
        Indicators::find()
            .inner_join(UserIndicators)
            .filter(user_indicators::Column::UserId.eq(user_id))
            .order_by_asc(indicators::Column::Id)
            .all(&self.conn)
            .await
    }
}

/// Replaces the user's indicator set. Callers pass a transaction so the
/// delete and the insert become visible together.
pub async fn replace_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    indicator_ids: &[i32],
) -> Result<(), DbErr> {
    UserIndicators::delete_many()
        .filter(user_indicators::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;

    if !indicator_ids.is_empty() {
        let rows: Vec<user_indicators::ActiveModel> = indicator_ids
            .iter()
            .map(|&indicator_id| user_indicators::ActiveModel {
                user_id: Set(user_id),
                indicator_id: Set(indicator_id),
            })
            .collect();

        UserIndicators::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
    }

    Ok(())
}
