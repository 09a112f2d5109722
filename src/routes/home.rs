use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "General",
    responses(
        (status = 200, description = "Service banner", body = RootResponse)
    )
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to the SoundGate API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    #[schema(value_type = Object)]
    pub services: serde_json::Value,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "General",
    responses(
        (status = 200, description = "All services healthy", body = HealthResponse),
        (status = 503, description = "One or more services unhealthy", body = HealthResponse)
    )
)]
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let mut healthy = true;

    let store = match state.store.ping().await {
        Ok(()) => json!({"status": "healthy", "message": "Connected"}),
        Err(e) => {
            healthy = false;
            tracing::error!("State store health check failed: {}", e);
            json!({"status": "unhealthy", "message": e.to_string()})
        }
    };

    let storage = match state.storage.health().await {
        Ok(()) => json!({"status": "healthy", "message": "Accessible"}),
        Err(e) => {
            healthy = false;
            tracing::error!("Storage health check failed: {}", e);
            json!({"status": "unhealthy", "message": e.to_string()})
        }
    };

    let status_code = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        services: json!({
            "state_store": store,
            "storage": storage,
        }),
    };

    (status_code, Json(response))
}
