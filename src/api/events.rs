use axum::{Extension, extract::State, http::StatusCode};
use std::sync::Arc;

use super::auth::Authenticated;
use super::extract::{Json, Path};
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, CreatedEventResponse};
use crate::domain::EventId;
use crate::services::{EventDetails, EventEdit, EventSummary, NewEventRequest};

/// GET /events
pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<EventSummary>>>, ApiError> {
    let events = state.events().list_events().await?;
    Ok(Json(ApiResponse::success(events)))
}

/// POST /events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
    Json(payload): Json<NewEventRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedEventResponse>>), ApiError> {
    let event_id = state.events().add_event(&auth.account, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedEventResponse { event_id })),
    ))
}

/// GET /events/suggested
pub async fn suggested_events(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<ApiResponse<Vec<EventDetails>>>, ApiError> {
    let events = state.events().suggested_events(&auth.account).await?;
    Ok(Json(ApiResponse::success(events)))
}

/// GET /events/{id}
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EventDetails>>, ApiError> {
    let id = validate_id("event", id)?;
    let event = state.events().get_event(EventId::new(id)).await?;
    Ok(Json(ApiResponse::success(event)))
}

/// PATCH /events/{id}
pub async fn edit_event(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
    Path(id): Path<i32>,
    Json(payload): Json<EventEdit>,
) -> Result<Json<ApiResponse<EventDetails>>, ApiError> {
    let id = EventId::new(validate_id("event", id)?);
    let events = state.events();

    events.edit_event(&auth.account, id, payload).await?;
    let event = events.get_event(id).await?;
    Ok(Json(ApiResponse::success(event)))
}

/// POST /events/{id}/verify
pub async fn verify_event(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EventSummary>>, ApiError> {
    let id = EventId::new(validate_id("event", id)?);
    let events = state.events();

    events.verify_event(&auth.account, id).await?;
    let event = events.get_event(id).await?;
    Ok(Json(ApiResponse::success(event.event)))
}
