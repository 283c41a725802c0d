use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use doctor_cell::models::{Coordinates, UserLocation};
use doctor_cell::services::LocationService;
use notification_cell::push_routes;
use notification_cell::services::NotificationService;
use shared_api_client::ApiClient;
use shared_config::AppConfig;

#[derive(Clone)]
struct ApiState {
    config: Arc<AppConfig>,
    backend: ApiClient,
    location: LocationService,
}

#[derive(Debug, Deserialize)]
struct LocationQuery {
    lat: Option<f64>,
    lon: Option<f64>,
}

pub fn create_router(config: Arc<AppConfig>) -> anyhow::Result<Router> {
    let state = ApiState {
        backend: ApiClient::new(&config)?,
        location: LocationService::new(&config),
        config: config.clone(),
    };
    let notifications = NotificationService::from_config(&config);

    let router = Router::new()
        .route("/", get(|| async { "MediLink API is running!" }))
        .route("/health", get(health))
        .route("/location", get(location))
        .with_state(state)
        .nest("/push", push_routes(notifications));

    Ok(router)
}

async fn health(State(state): State<ApiState>) -> Json<Value> {
    let backend_reachable = state.backend.test_connection().await;
    debug!("Backend reachable: {}", backend_reachable);

    Json(json!({
        "status": "ok",
        "configured": state.config.is_configured(),
        "pushConfigured": state.config.is_push_configured(),
        "backendReachable": backend_reachable,
    }))
}

/// Coordinates are used only when both `lat` and `lon` are present.
async fn location(State(state): State<ApiState>, Query(query): Query<LocationQuery>) -> Json<UserLocation> {
    let coordinates = match (query.lat, query.lon) {
        (Some(latitud), Some(longitud)) => Some(Coordinates { latitud, longitud }),
        _ => None,
    };

    Json(state.location.resolve(coordinates).await)
}
