use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, Unchanged, sea_query::Expr,
};

use crate::entities::{event_indicators, event_pictures, events, indicators, prelude::*};

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub date: String,
    pub address: String,
    pub organizer_id: i32,
    pub picture_path: String,
}

/// Partial event update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub address: Option<String>,
    pub picture_path: Option<String>,
}

impl EventChanges {
    const fn touches_event_row(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.date.is_some()
            || self.address.is_some()
    }
}

pub struct EventRepository {
    conn: DatabaseConnection,
}

impl EventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<events::Model>, DbErr> {
        Events::find_by_id(id).one(&self.conn).await
    }

    pub async fn list_all(&self) -> Result<Vec<events::Model>, DbErr> {
        Events::find()
            .order_by_asc(events::Column::Id)
            .all(&self.conn)
            .await
    }

    pub async fn list_verified(&self) -> Result<Vec<events::Model>, DbErr> {
        Events::find()
            .filter(events::Column::Verified.eq(true))
            .order_by_asc(events::Column::Id)
            .all(&self.conn)
            .await
    }

    /// Indicator tags for each of `event_ids`, as `(event_id, indicator)` pairs.
    pub async fn indicators_for(
        &self,
        event_ids: &[i32],
    ) -> Result<Vec<(i32, indicators::Model)>, DbErr> {
        let rows = EventIndicators::find()
            .filter(event_indicators::Column::EventId.is_in(event_ids.iter().copied()))
            .order_by_asc(event_indicators::Column::EventId)
            .order_by_asc(event_indicators::Column::IndicatorId)
            .find_also_related(Indicators)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(link, indicator)| indicator.map(|i| (link.event_id, i)))
            .collect())
    }

    pub async fn picture_path(&self, event_id: i32) -> Result<Option<String>, DbErr> {
        let picture = EventPictures::find()
            .filter(event_pictures::Column::EventId.eq(event_id))
            .one(&self.conn)
            .await?;

        Ok(picture.map(|p| p.path_to_picture))
    }

    /// Returns `false` when no event has this id.
    pub async fn set_verified(&self, id: i32) -> Result<bool, DbErr> {
        let result = Events::update_many()
            .col_expr(events::Column::Verified, Expr::value(true))
            .filter(events::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

/// Inserts an unverified event plus its picture reference and returns the
/// engine-generated event id.
pub async fn insert<C: ConnectionTrait>(conn: &C, event: NewEvent) -> Result<i32, DbErr> {
    let result = Events::insert(events::ActiveModel {
        name: Set(event.name),
        description: Set(event.description),
        date: Set(event.date),
        address: Set(event.address),
        organizer_id: Set(event.organizer_id),
        verified: Set(false),
        created_at: Set(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    })
    .exec(conn)
    .await?;

    let event_id = result.last_insert_id;

    EventPictures::insert(event_pictures::ActiveModel {
        event_id: Set(event_id),
        path_to_picture: Set(event.picture_path),
        ..Default::default()
    })
    .exec(conn)
    .await?;

    Ok(event_id)
}

pub async fn update<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    changes: EventChanges,
) -> Result<(), DbErr> {
    if changes.touches_event_row() {
        let mut active = events::ActiveModel {
            id: Unchanged(id),
            ..Default::default()
        };

        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(date) = changes.date {
            active.date = Set(date);
        }
        if let Some(address) = changes.address {
            active.address = Set(address);
        }

        active.update(conn).await?;
    }

    if let Some(path) = changes.picture_path {
        EventPictures::update_many()
            .col_expr(event_pictures::Column::PathToPicture, Expr::value(path))
            .filter(event_pictures::Column::EventId.eq(id))
            .exec(conn)
            .await?;
    }

    Ok(())
}

/// Replaces the event's indicator set; run inside a transaction.
pub async fn replace_indicators<C: ConnectionTrait>(
    conn: &C,
    event_id: i32,
    indicator_ids: &[i32],
) -> Result<(), DbErr> {
    EventIndicators::delete_many()
        .filter(event_indicators::Column::EventId.eq(event_id))
        .exec(conn)
        .await?;

    if !indicator_ids.is_empty() {
        let rows: Vec<event_indicators::ActiveModel> = indicator_ids
            .iter()
            .map(|&indicator_id| event_indicators::ActiveModel {
                event_id: Set(event_id),
                indicator_id: Set(indicator_id),
            })
            .collect();

        EventIndicators::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
    }

    Ok(())
}
