use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use super::auth::Authenticated;
use super::{ApiError, ApiResponse, AppState, CompetenceDto, MessageResponse, UniversityDto};
use crate::services::{IndicatorDto, Operation};

/// GET /universities
pub async fn list_universities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<UniversityDto>>>, ApiError> {
    let reference = state.shared.reference.get().await?;
    let universities = reference
        .universities
        .iter()
        .map(|(id, name)| UniversityDto {
            university_id: *id,
            name: name.clone(),
        })
        .collect();
    Ok(Json(ApiResponse::success(universities)))
}

/// GET /indicators
pub async fn list_indicators(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<IndicatorDto>>>, ApiError> {
    let indicators = state
        .store()
        .list_indicators()
        .await?
        .into_iter()
        .map(IndicatorDto::from)
        .collect();
    Ok(Json(ApiResponse::success(indicators)))
}

/// GET /competencies
pub async fn list_competencies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CompetenceDto>>>, ApiError> {
    let competencies = state
        .store()
        .list_competencies()
        .await?
        .into_iter()
        .map(|c| CompetenceDto {
            competence_id: c.id,
            name: c.name,
        })
        .collect();
    Ok(Json(ApiResponse::success(competencies)))
}

/// POST /reference/reload
pub async fn reload(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .shared
        .gate
        .authorize(&auth.account, Operation::ReloadReference)?;

    state.shared.reference.invalidate().await;
    let reference = state.shared.reference.load().await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Reloaded {} roles and {} universities",
        reference.roles.len(),
        reference.universities.len()
    )))))
}
