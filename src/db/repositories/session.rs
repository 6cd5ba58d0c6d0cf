use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, sea_query::Expr,
};

use crate::entities::{api_keys, prelude::*};

/// Session metadata returned to the owning account (never key material).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub id: i32,
    pub user_id: i32,
    pub ip_address: String,
    pub last_useragent: String,
    pub last_access: String,
    pub created_at: String,
}

impl From<api_keys::Model> for SessionRow {
    fn from(model: api_keys::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            ip_address: model.ip_address,
            last_useragent: model.last_useragent,
            last_access: model.last_access,
            created_at: model.created_at,
        }
    }
}

pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_hash(&self, key_hash: &str) -> Result<Option<SessionRow>, DbErr> {
        let row = ApiKeys::find()
            .filter(api_keys::Column::KeyHash.eq(key_hash))
            .one(&self.conn)
            .await?;

        Ok(row.map(SessionRow::from))
    }

    pub async fn touch(&self, id: i32, ip_address: &str, user_agent: &str) -> Result<(), DbErr> {
        ApiKeys::update_many()
            .col_expr(api_keys::Column::IpAddress, Expr::value(ip_address))
            .col_expr(api_keys::Column::LastUseragent, Expr::value(user_agent))
            .col_expr(
                api_keys::Column::LastAccess,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(api_keys::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn delete_by_hash(&self, key_hash: &str) -> Result<bool, DbErr> {
        let result = ApiKeys::delete_many()
            .filter(api_keys::Column::KeyHash.eq(key_hash))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<SessionRow>, DbErr> {
        let rows = ApiKeys::find()
            .filter(api_keys::Column::UserId.eq(user_id))
            .order_by_asc(api_keys::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(SessionRow::from).collect())
    }

    /// Whether this account has ever had a session from `ip_address`.
    pub async fn is_known_ip(&self, user_id: i32, ip_address: &str) -> Result<bool, DbErr> {
        let count = ApiKeys::find()
            .filter(api_keys::Column::UserId.eq(user_id))
            .filter(api_keys::Column::IpAddress.eq(ip_address))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }
}

pub async fn hash_exists<C: ConnectionTrait>(conn: &C, key_hash: &str) -> Result<bool, DbErr> {
    let count = ApiKeys::find()
        .filter(api_keys::Column::KeyHash.eq(key_hash))
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    key_hash: String,
    user_id: i32,
    ip_address: String,
    user_agent: String,
) -> Result<i32, DbErr> {
    let now = chrono::Utc::now().to_rfc3339();

    let result = ApiKeys::insert(api_keys::ActiveModel {
        key_hash: Set(key_hash),
        user_id: Set(user_id),
        ip_address: Set(ip_address),
        last_useragent: Set(user_agent),
        last_access: Set(now.clone()),
        created_at: Set(now),
        ..Default::default()
    })
    .exec(conn)
    .await?;

    Ok(result.last_insert_id)
}
