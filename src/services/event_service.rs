//! Domain service for events and event recommendation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::{EVENT_DATE_FORMAT, EventId, UserId};
use crate::entities::events;
use crate::services::ServiceError;
use crate::services::account_service::{Account, IndicatorDto};

#[derive(Debug, Clone, Deserialize)]
pub struct NewEventRequest {
    pub name: String,
    pub description: String,
    pub date: String,
    pub address: String,
    pub picture_path: String,
    #[serde(default)]
    pub indicators: Vec<i32>,
}

/// Partial event update. `indicators`, when present, replaces the whole set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub address: Option<String>,
    pub picture_path: Option<String>,
    pub indicators: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    pub event_id: EventId,
    pub organizer_id: UserId,
    pub verified: bool,
    pub date: String,
    pub address: String,
    pub name: String,
    pub description: String,
}

impl From<events::Model> for EventSummary {
    fn from(model: events::Model) -> Self {
        Self {
            event_id: EventId::new(model.id),
            organizer_id: UserId::new(model.organizer_id),
            verified: model.verified,
            date: model.date,
            address: model.address,
            name: model.name,
            description: model.description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: EventSummary,
    pub indicators: Vec<IndicatorDto>,
    pub preview_picture: Option<String>,
}

/// Parses a client-supplied date and re-renders it in the stored format.
pub fn normalize_date(raw: &str) -> Result<String, ServiceError> {
    NaiveDateTime::parse_from_str(raw.trim(), EVENT_DATE_FORMAT)
        .map(|date| date.format(EVENT_DATE_FORMAT).to_string())
        .map_err(|_| {
            ServiceError::validation(format!(
                "Invalid date '{raw}', expected YYYY-MM-DD HH:MM:SS"
            ))
        })
}

/// Keeps verified candidates sharing at least one indicator with
/// `interests`. Order is preserved and each event appears at most once.
#[must_use]
pub fn select_suggested<T>(
    candidates: impl IntoIterator<Item = (events::Model, T)>,
    interests: &HashSet<i32>,
) -> Vec<(events::Model, T)>
where
    T: AsRef<[i32]>,
{
    let mut seen = HashSet::new();

    candidates
        .into_iter()
        .filter(|(event, tags)| {
            event.verified && tags.as_ref().iter().any(|tag| interests.contains(tag))
        })
        .filter(|(event, _)| seen.insert(event.id))
        .collect()
}

#[async_trait::async_trait]
pub trait EventService: Send + Sync {
    /// Creates an unverified event and returns its id.
    ///
    /// # Errors
    ///
    /// [`ServiceError::PermissionDenied`] unless the account's role may create
    /// events.
    async fn add_event(
        &self,
        account: &Account,
        request: NewEventRequest,
    ) -> Result<EventId, ServiceError>;

    /// Only the organizer or the elevated role may edit.
    async fn edit_event(
        &self,
        account: &Account,
        id: EventId,
        edit: EventEdit,
    ) -> Result<(), ServiceError>;

    async fn verify_event(&self, account: &Account, id: EventId) -> Result<(), ServiceError>;

    async fn get_event(&self, id: EventId) -> Result<EventDetails, ServiceError>;

    async fn list_events(&self) -> Result<Vec<EventSummary>, ServiceError>;

    async fn suggested_events(&self, account: &Account) -> Result<Vec<EventDetails>, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i32, verified: bool) -> events::Model {
        events::Model {
            id,
            name: format!("Event {id}"),
            date: "2024-05-01 18:00:00".to_string(),
            address: "Main hall".to_string(),
            description: String::new(),
            organizer_id: 1,
            verified,
            created_at: String::new(),
        }
    }

    fn ids(selected: &[(events::Model, Vec<i32>)]) -> Vec<i32> {
        selected.iter().map(|(e, _)| e.id).collect()
    }

    #[test]
    fn multi_indicator_match_appears_once() {
        let interests: HashSet<i32> = [1, 2, 3].into_iter().collect();
        let candidates = vec![(event(10, true), vec![1, 2, 3]), (event(11, true), vec![9])];

        assert_eq!(ids(&select_suggested(candidates, &interests)), vec![10]);
    }

    #[test]
    fn unverified_events_are_never_suggested() {
        let interests: HashSet<i32> = [1].into_iter().collect();
        let candidates = vec![(event(1, false), vec![1]), (event(2, true), vec![1])];

        assert_eq!(ids(&select_suggested(candidates, &interests)), vec![2]);
    }

    #[test]
    fn repeated_candidates_are_collapsed_in_order() {
        let interests: HashSet<i32> = [4].into_iter().collect();
        let candidates = vec![
            (event(3, true), vec![4]),
            (event(1, true), vec![4]),
            (event(3, true), vec![4]),
        ];

        assert_eq!(ids(&select_suggested(candidates, &interests)), vec![3, 1]);
    }

    #[test]
    fn no_interests_means_no_suggestions() {
        let candidates = vec![(event(1, true), vec![1, 2])];
        assert!(select_suggested(candidates, &HashSet::new()).is_empty());
    }

    #[test]
    fn dates_are_normalized() {
        assert_eq!(
            normalize_date(" 2024-09-01 09:30:00 ").unwrap(),
            "2024-09-01 09:30:00"
        );
        assert!(matches!(
            normalize_date("01/09/2024"),
            Err(ServiceError::Validation(_))
        ));
    }
}
