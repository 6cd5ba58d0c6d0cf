use axum::{Extension, extract::State, http::StatusCode};
use std::sync::Arc;

use super::auth::{Authenticated, Client};
use super::extract::{Json, Path, Query};
use super::validation::validate_id;
use super::{
    ApiError, ApiKeyResponse, ApiResponse, AppState, IdListRequest, LoginRequest,
    MessageResponse, ViewAsQuery,
};
use crate::domain::UserId;
use crate::services::{IndicatorDto, ProfileEdit, ProfileView, Registration, SessionInfo};

/// POST /account/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Client(client): Client,
    Json(payload): Json<Registration>,
) -> Result<(StatusCode, Json<ApiResponse<ApiKeyResponse>>), ApiError> {
    let api_key = state.accounts().register(payload, &client).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ApiKeyResponse { api_key })),
    ))
}

/// POST /account/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Client(client): Client,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<ApiKeyResponse>>, ApiError> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let api_key = state
        .accounts()
        .login(&payload.email, &payload.password, &client)
        .await?;

    Ok(Json(ApiResponse::success(ApiKeyResponse { api_key })))
}

/// POST /account/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.accounts().logout(&auth.api_key).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new("Logged out"))))
}

/// GET /account
pub async fn get_self(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<ApiResponse<ProfileView>>, ApiError> {
    let view = state.accounts().render_self(&auth.account).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// PATCH /account
pub async fn edit_self(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
    Json(payload): Json<ProfileEdit>,
) -> Result<Json<ApiResponse<ProfileView>>, ApiError> {
    let accounts = state.accounts();
    accounts.edit_profile(&auth.account, payload).await?;

    let updated = accounts.get_account(auth.account.id).await?;
    let view = accounts.render_self(&updated).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// GET /account/sessions
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<ApiResponse<Vec<SessionInfo>>>, ApiError> {
    let sessions = state.accounts().list_sessions(&auth.account).await?;
    Ok(Json(ApiResponse::success(sessions)))
}

/// GET /account/indicators
pub async fn get_indicators(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
) -> Result<Json<ApiResponse<Vec<IndicatorDto>>>, ApiError> {
    let indicators = state.accounts().indicators(&auth.account).await?;
    Ok(Json(ApiResponse::success(indicators)))
}

/// PUT /account/indicators
pub async fn set_indicators(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
    Json(payload): Json<IdListRequest>,
) -> Result<Json<ApiResponse<Vec<IndicatorDto>>>, ApiError> {
    let accounts = state.accounts();
    accounts.set_indicators(&auth.account, &payload.ids).await?;

    let indicators = accounts.indicators(&auth.account).await?;
    Ok(Json(ApiResponse::success(indicators)))
}

/// PUT /account/competencies
pub async fn set_preference_competencies(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
    Json(payload): Json<IdListRequest>,
) -> Result<Json<ApiResponse<Vec<i32>>>, ApiError> {
    let accounts = state.accounts();
    accounts
        .set_preference_competencies(&auth.account, &payload.ids)
        .await?;

    let ids = accounts.preference_competencies(&auth.account).await?;
    Ok(Json(ApiResponse::success(ids)))
}

/// GET /accounts/{id}?as=<role>
pub async fn view_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Authenticated>,
    Path(id): Path<i32>,
    Query(query): Query<ViewAsQuery>,
) -> Result<Json<ApiResponse<ProfileView>>, ApiError> {
    let id = validate_id("account", id)?;

    let view = state
        .accounts()
        .view_profile(&auth.account, UserId::new(id), query.as_role.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(view)))
}
