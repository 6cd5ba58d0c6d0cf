use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, patch, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AccountService, EventService};
use crate::state::SharedState;

mod accounts;
pub mod auth;
mod error;
mod events;
mod extract;
mod observability;
mod reference;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

pub const API_PREFIX: &str = "/campus/api/v1";

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn accounts(&self) -> &Arc<dyn AccountService> {
        &self.shared.account_service
    }

    #[must_use]
    pub fn events(&self) -> &Arc<dyn EventService> {
        &self.shared.event_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/health", get(system::health))
        .route("/account/register", post(accounts::register))
        .route("/account/login", post(accounts::login))
        .route("/universities", get(reference::list_universities))
        .route("/indicators", get(reference::list_indicators))
        .route("/competencies", get(reference::list_competencies))
        .route_layer(middleware::from_fn(observability::logging_middleware))
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest(API_PREFIX, api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/account", get(accounts::get_self))
        .route("/account", patch(accounts::edit_self))
        .route("/account/logout", post(accounts::logout))
        .route("/account/sessions", get(accounts::list_sessions))
        .route("/account/indicators", get(accounts::get_indicators))
        .route("/account/indicators", put(accounts::set_indicators))
        .route(
            "/account/competencies",
            put(accounts::set_preference_competencies),
        )
        .route("/accounts/{id}", get(accounts::view_account))
        .route("/events", get(events::list_events))
        .route("/events", post(events::create_event))
        .route("/events/suggested", get(events::suggested_events))
        .route("/events/{id}", get(events::get_event))
        .route("/events/{id}", patch(events::edit_event))
        .route("/events/{id}/verify", post(events::verify_event))
        .route("/reference/reload", post(reference::reload))
        .route("/metrics", get(system::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
