//! `SeaORM` implementation of the `EventService` trait.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::repositories::event as event_repo;
use crate::db::{EventChanges, NewEvent, Store};
use crate::domain::{EventId, UserId};
use crate::entities::{events, indicators};
use crate::services::ServiceError;
use crate::services::account_service::{Account, IndicatorDto, dedup_ids};
use crate::services::account_service_impl::check_indicator_ids;
use crate::services::authorization::{Operation, RoleGate};
use crate::services::event_service::{
    EventDetails, EventEdit, EventService, EventSummary, NewEventRequest, normalize_date,
    select_suggested,
};
use crate::services::picture::PictureService;

pub struct SeaOrmEventService {
    store: Store,
    gate: Arc<RoleGate>,
    pictures: Arc<PictureService>,
}

impl SeaOrmEventService {
    #[must_use]
    pub const fn new(store: Store, gate: Arc<RoleGate>, pictures: Arc<PictureService>) -> Self {
        Self {
            store,
            gate,
            pictures,
        }
    }

    async fn details(
        &self,
        event: events::Model,
        tags: Vec<indicators::Model>,
    ) -> Result<EventDetails, ServiceError> {
        let preview_picture = match self.store.event_picture_path(event.id).await? {
            Some(path) => self.pictures.preview(&path).await,
            None => None,
        };

        Ok(EventDetails {
            event: EventSummary::from(event),
            indicators: tags.into_iter().map(IndicatorDto::from).collect(),
            preview_picture,
        })
    }

    /// Indicator models per event id, in tag order.
    async fn tags_by_event(
        &self,
        event_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<indicators::Model>>, ServiceError> {
        let mut grouped: HashMap<i32, Vec<indicators::Model>> = HashMap::new();
        if event_ids.is_empty() {
            return Ok(grouped);
        }

        for (event_id, indicator) in self.store.event_indicators(event_ids).await? {
            grouped.entry(event_id).or_default().push(indicator);
        }
        Ok(grouped)
    }
}

fn non_empty(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl EventService for SeaOrmEventService {
    async fn add_event(
        &self,
        account: &Account,
        request: NewEventRequest,
    ) -> Result<EventId, ServiceError> {
        self.gate.authorize_event_creation(account)?;

        let name = non_empty("name", &request.name)?;
        let address = non_empty("address", &request.address)?;
        let date = normalize_date(&request.date)?;
        PictureService::validate_path(&request.picture_path)?;

        let indicator_ids = dedup_ids(&request.indicators);
        check_indicator_ids(&self.store, &indicator_ids).await?;

        let txn = self.store.begin().await?;

        let event_id = event_repo::insert(
            &txn,
            NewEvent {
                name,
                description: request.description.trim().to_string(),
                date,
                address,
                organizer_id: account.id.value(),
                picture_path: request.picture_path.trim().to_string(),
            },
        )
        .await?;
        event_repo::replace_indicators(&txn, event_id, &indicator_ids).await?;

        txn.commit().await?;

        info!(event_id, organizer_id = %account.id, "Event created");
        Ok(EventId::new(event_id))
    }

    async fn edit_event(
        &self,
        account: &Account,
        id: EventId,
        edit: EventEdit,
    ) -> Result<(), ServiceError> {
        let event = self
            .store
            .get_event(id.value())
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", id))?;

        self.gate
            .authorize_event_mutation(account, UserId::new(event.organizer_id))?;

        let mut changes = EventChanges::default();
        if let Some(name) = edit.name {
            changes.name = Some(non_empty("name", &name)?);
        }
        if let Some(description) = edit.description {
            changes.description = Some(description.trim().to_string());
        }
        if let Some(date) = edit.date {
            changes.date = Some(normalize_date(&date)?);
        }
        if let Some(address) = edit.address {
            changes.address = Some(non_empty("address", &address)?);
        }
        if let Some(path) = edit.picture_path {
            PictureService::validate_path(&path)?;
            changes.picture_path = Some(path.trim().to_string());
        }

        let indicator_ids = match edit.indicators {
            Some(ids) => {
                let ids = dedup_ids(&ids);
                check_indicator_ids(&self.store, &ids).await?;
                Some(ids)
            }
            None => None,
        };

        let txn = self.store.begin().await?;
        event_repo::update(&txn, id.value(), changes).await?;
        if let Some(ids) = &indicator_ids {
            event_repo::replace_indicators(&txn, id.value(), ids).await?;
        }
        txn.commit().await?;

        debug!(event_id = %id, user_id = %account.id, "Event edited");
        Ok(())
    }

    async fn verify_event(&self, account: &Account, id: EventId) -> Result<(), ServiceError> {
        self.gate.authorize(account, Operation::VerifyEvent)?;

        if !self.store.verify_event(id.value()).await? {
            return Err(ServiceError::not_found("Event", id));
        }

        info!(event_id = %id, verifier_id = %account.id, "Event verified");
        Ok(())
    }

    async fn get_event(&self, id: EventId) -> Result<EventDetails, ServiceError> {
        let event = self
            .store
            .get_event(id.value())
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", id))?;

        let tags = self
            .tags_by_event(&[event.id])
            .await?
            .remove(&event.id)
            .unwrap_or_default();

        self.details(event, tags).await
    }

    async fn list_events(&self) -> Result<Vec<EventSummary>, ServiceError> {
        Ok(self
            .store
            .list_events()
            .await?
            .into_iter()
            .map(EventSummary::from)
            .collect())
    }

    async fn suggested_events(&self, account: &Account) -> Result<Vec<EventDetails>, ServiceError> {
        let interests: HashSet<i32> = self
            .store
            .user_indicators(account.id.value())
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();

        if interests.is_empty() {
            return Ok(Vec::new());
        }

        let verified = self.store.list_verified_events().await?;
        let event_ids: Vec<i32> = verified.iter().map(|e| e.id).collect();
        let mut tags = self.tags_by_event(&event_ids).await?;

        let candidates = verified.into_iter().map(|event| {
            let tag_ids: Vec<i32> = tags
                .get(&event.id)
                .map(|t| t.iter().map(|i| i.id).collect())
                .unwrap_or_default();
            (event, tag_ids)
        });
        let selected = select_suggested(candidates, &interests);

        let mut suggestions = Vec::with_capacity(selected.len());
        for (event, _) in selected {
            let event_tags = tags.remove(&event.id).unwrap_or_default();
            suggestions.push(self.details(event, event_tags).await?);
        }

        debug!(user_id = %account.id, count = suggestions.len(), "Suggestions computed");
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::AccountService;
    use crate::services::testing::{Harness, test_config};

    fn request(name: &str, indicators: Vec<i32>) -> NewEventRequest {
        NewEventRequest {
            name: name.to_string(),
            description: "Bring a friend".to_string(),
            date: "2024-10-01 18:00:00".to_string(),
            address: "Main hall".to_string(),
            picture_path: "events/poster.jpg".to_string(),
            indicators,
        }
    }

    async fn organizers_may_create() -> Harness {
        let mut config = test_config();
        config.policy.event_creation_roles = vec!["Organizer".to_string(), "Assessor".to_string()];
        Harness::with_config(config).await
    }

    #[tokio::test]
    async fn default_policy_blocks_organizer_creation() {
        let h = Harness::new().await;
        let organizer = h.with_role("o@example.com", "Organizer").await;
        let assessor = h.with_role("a@example.com", "Assessor").await;

        assert!(matches!(
            h.events.add_event(&organizer, request("Hack night", vec![1])).await,
            Err(ServiceError::PermissionDenied)
        ));
        assert!(h.events.add_event(&assessor, request("Hack night", vec![1])).await.is_ok());
    }

    #[tokio::test]
    async fn created_event_is_unverified_with_its_own_id() {
        let h = Harness::new().await;
        let assessor = h.with_role("a@example.com", "Assessor").await;

        let first = h.events.add_event(&assessor, request("Same", vec![1])).await.unwrap();
        let second = h.events.add_event(&assessor, request("Same", vec![1])).await.unwrap();
        assert_ne!(first, second);

        let details = h.events.get_event(second).await.unwrap();
        assert_eq!(details.event.event_id, second);
        assert!(!details.event.verified);
        assert_eq!(details.indicators.len(), 1);
        assert!(details.preview_picture.is_none());
    }

    #[tokio::test]
    async fn invalid_input_creates_nothing() {
        let h = Harness::new().await;
        let assessor = h.with_role("a@example.com", "Assessor").await;

        let mut bad_date = request("Bad date", vec![]);
        bad_date.date = "tomorrow".to_string();
        assert!(matches!(
            h.events.add_event(&assessor, bad_date).await,
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            h.events.add_event(&assessor, request("Bad tag", vec![999])).await,
            Err(ServiceError::Validation(_))
        ));

        let mut escaping = request("Escaping", vec![]);
        escaping.picture_path = "../../etc/passwd".to_string();
        assert!(h.events.add_event(&assessor, escaping).await.is_err());

        assert!(h.events.list_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn editing_missing_event_is_not_found() {
        let h = Harness::new().await;
        let assessor = h.with_role("a@example.com", "Assessor").await;

        assert!(matches!(
            h.events
                .edit_event(&assessor, EventId::new(42), EventEdit::default())
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            h.events.verify_event(&assessor, EventId::new(42)).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn organizer_event_lifecycle() {
        let h = organizers_may_create().await;
        let organizer = h.with_role("o@example.com", "Organizer").await;
        let outsider = h.with_role("u@example.com", "Organizer").await;
        let assessor = h.with_role("v@example.com", "Assessor").await;
        let attendee = h.student("s@example.com").await;
        h.accounts.set_indicators(&attendee, &[2]).await.unwrap();

        let event_id = h.events.add_event(&organizer, request("Robotics", vec![1, 2])).await.unwrap();

        assert!(h.events.suggested_events(&attendee).await.unwrap().is_empty());

        let rename = EventEdit {
            name: Some("Robotics cup".to_string()),
            ..EventEdit::default()
        };
        assert!(matches!(
            h.events.edit_event(&outsider, event_id, rename.clone()).await,
            Err(ServiceError::PermissionDenied)
        ));
        h.events.edit_event(&organizer, event_id, rename).await.unwrap();

        assert!(matches!(
            h.events.verify_event(&organizer, event_id).await,
            Err(ServiceError::PermissionDenied)
        ));
        h.events.verify_event(&assessor, event_id).await.unwrap();

        let suggestions = h.events.suggested_events(&attendee).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].event.event_id, event_id);
        assert_eq!(suggestions[0].event.name, "Robotics cup");
    }

    #[tokio::test]
    async fn suggestions_are_deduplicated_and_verified_only() {
        let h = Harness::new().await;
        let assessor = h.with_role("a@example.com", "Assessor").await;
        let attendee = h.student("s@example.com").await;
        h.accounts.set_indicators(&attendee, &[1, 2, 3]).await.unwrap();

        let shared = h.events.add_event(&assessor, request("Triple", vec![1, 2, 3])).await.unwrap();
        let hidden = h.events.add_event(&assessor, request("Hidden", vec![1])).await.unwrap();
        let unrelated = h.events.add_event(&assessor, request("Other", vec![5])).await.unwrap();

        h.events.verify_event(&assessor, shared).await.unwrap();
        h.events.verify_event(&assessor, unrelated).await.unwrap();

        let ids: Vec<EventId> = h
            .events
            .suggested_events(&attendee)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.event.event_id)
            .collect();
        assert_eq!(ids, vec![shared]);
        assert!(!ids.contains(&hidden));
    }

    #[tokio::test]
    async fn edit_replaces_indicator_set() {
        let h = Harness::new().await;
        let assessor = h.with_role("a@example.com", "Assessor").await;
        let event_id = h.events.add_event(&assessor, request("Tagged", vec![1, 2])).await.unwrap();

        h.events
            .edit_event(
                &assessor,
                event_id,
                EventEdit {
                    indicators: Some(vec![4]),
                    ..EventEdit::default()
                },
            )
            .await
            .unwrap();

        let tags: Vec<i32> = h
            .events
            .get_event(event_id)
            .await
            .unwrap()
            .indicators
            .into_iter()
            .map(|i| i.indicator_id)
            .collect();
        assert_eq!(tags, vec![4]);
    }
}
